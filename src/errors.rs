use std::fmt;

/// Where a fault was observed: element (or block) index and the iteration
/// of the repeated pass that saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaultLocation {
    pub index: usize,
    pub iteration: usize,
}

impl FaultLocation {
    pub fn new(index: usize, iteration: usize) -> Self {
        Self { index, iteration }
    }
}

impl fmt::Display for FaultLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index {} (iteration {})", self.index, self.iteration)
    }
}

/// Errors raised by the codecs and their setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodingError {
    /// An AN-coded value failed validation
    CorruptionDetected(FaultLocation),
    /// A Hamming code or block checksum diverged from its recomputation
    ChecksumMismatch(FaultLocation),
    /// The modular inverse could not be established for a constant
    InvariantViolation { constant: u128, bits: u32 },
    /// The code constant does not fit the raw element width
    InvalidConstant { constant: u128, raw_bits: u32 },
    /// Codec or harness configuration is unusable
    InvalidConfig(String),
    /// Input and output buffers disagree in length
    LengthMismatch { expected: usize, actual: usize },
    /// Division of encoded data by a zero operand
    DivisionByZero,
    /// The operation needs at least one element
    EmptyInput,
}

impl CodingError {
    pub fn corruption(index: usize, iteration: usize) -> Self {
        CodingError::CorruptionDetected(FaultLocation::new(index, iteration))
    }

    pub fn mismatch(index: usize, iteration: usize) -> Self {
        CodingError::ChecksumMismatch(FaultLocation::new(index, iteration))
    }

    /// Location of a per-element fault, if this is one.
    pub fn location(&self) -> Option<FaultLocation> {
        match self {
            CodingError::CorruptionDetected(loc) | CodingError::ChecksumMismatch(loc) => {
                Some(*loc)
            }
            _ => None,
        }
    }

    /// Checksum divergence would drive correction in a full system, so it is
    /// the one fault class that is not fatal to the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CodingError::ChecksumMismatch(_))
    }

    /// One-line description without hint or colour
    pub fn message(&self) -> String {
        self.describe().0
    }

    fn describe(&self) -> (String, Option<String>) {
        match self {
            CodingError::CorruptionDetected(loc) => (
                format!("corruption detected at {}", loc),
                Some("the encoded value is not a valid codeword for this constant".to_string()),
            ),
            CodingError::ChecksumMismatch(loc) => (
                format!("checksum mismatch at {}", loc),
                Some("recomputed code differs from the stored one".to_string()),
            ),
            CodingError::InvariantViolation { constant, bits } => (
                format!("no inverse of {} modulo 2^{}", constant, bits),
                Some("the code constant A must be odd".to_string()),
            ),
            CodingError::InvalidConstant { constant, raw_bits } => (
                format!(
                    "constant {} does not fit {}-bit raw elements",
                    constant, raw_bits
                ),
                Some(format!("choose an odd A with 0 < A < 2^{}", raw_bits)),
            ),
            CodingError::InvalidConfig(msg) => (format!("invalid configuration: {}", msg), None),
            CodingError::LengthMismatch { expected, actual } => (
                format!(
                    "buffer length mismatch: expected {} elements, got {}",
                    expected, actual
                ),
                None,
            ),
            CodingError::DivisionByZero => ("division of encoded data by zero".to_string(), None),
            CodingError::EmptyInput => ("operation requires a non-empty buffer".to_string(), None),
        }
    }
}

impl fmt::Display for CodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let use_color = should_use_color();
        let (headline, hint) = self.describe();

        if use_color {
            write!(f, "\x1b[1;31merror:\x1b[0m {}", headline)?;
        } else {
            write!(f, "error: {}", headline)?;
        }
        if let Some(hint) = hint {
            if use_color {
                write!(f, "\n\x1b[1;36mhint:\x1b[0m {}", hint)?;
            } else {
                write!(f, "\nhint: {}", hint)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for CodingError {}

/// Check if colored output should be used
fn should_use_color() -> bool {
    // Respect NO_COLOR environment variable
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    use std::io::IsTerminal;
    std::io::stderr().is_terminal()
}

/// Fails with `LengthMismatch` unless both buffers hold `expected` elements.
pub(crate) fn ensure_len(expected: usize, actual: usize) -> Result<(), CodingError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CodingError::LengthMismatch { expected, actual })
    }
}
