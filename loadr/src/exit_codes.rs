#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// The run completed; failed requests are part of the report, not a process failure.
    Success = 0,

    /// Invalid CLI/config input (bad flags, unreadable config file, invalid URL or method, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors writing the report, a worker task panicking).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
