//! CSI parameter lists
//!
//! Semicolon-separated decimal parameters. A missing or empty parameter is
//! stored as zero; accessors that take a default treat zero as "use the
//! default", which is what every consumer in the CSI table wants.

/// Upper bound on stored parameters; the rest of a hostile list is dropped.
const MAX_PARAMS: usize = 32;

/// Parsed CSI parameters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    values: Vec<u16>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_slice(values: &[u16]) -> Self {
        Self {
            values: values.to_vec(),
        }
    }

    /// Parse the raw bytes collected between `CSI` and the final byte.
    /// Digits accumulate saturating; anything else was filtered out by the
    /// state machine before it reaches here.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut params = Self::new();
        if bytes.is_empty() {
            return params;
        }
        let mut current: u16 = 0;
        for &byte in bytes {
            match byte {
                b'0'..=b'9' => {
                    current = current
                        .saturating_mul(10)
                        .saturating_add(u16::from(byte - b'0'));
                }
                b';' => {
                    if params.values.len() < MAX_PARAMS {
                        params.values.push(current);
                    }
                    current = 0;
                }
                _ => {}
            }
        }
        if params.values.len() < MAX_PARAMS {
            params.values.push(current);
        }
        params
    }

    /// Parameter at `index`; `None` when absent or zero.
    pub fn get(&self, index: usize) -> Option<u16> {
        self.values.get(index).copied().filter(|&v| v != 0)
    }

    /// Parameter at `index`, falling back to `default` when absent or zero.
    pub fn get_or(&self, index: usize, default: u16) -> u16 {
        self.get(index).unwrap_or(default)
    }

    /// Raw parameter value; zero when absent. For selectors where zero is
    /// itself meaningful (erase modes, DA).
    pub fn raw(&self, index: usize) -> u16 {
        self.values.get(index).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.values.iter().copied()
    }

    /// The whole list as a slice, for multi-parameter consumers (SGR).
    pub fn as_slice(&self) -> &[u16] {
        &self.values
    }
}
