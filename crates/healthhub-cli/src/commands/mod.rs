pub mod allocation;
pub mod beds;
pub mod reconcile;

use std::process::ExitCode;

/// How a command finished when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Done,
    /// One write of a two-step operation committed and the other did not.
    Partial,
}

impl Completion {
    /// 0 on success, 2 on a partial failure. Errors exit with 1.
    pub fn code(self) -> u8 {
        match self {
            Self::Done => 0,
            Self::Partial => 2,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}
