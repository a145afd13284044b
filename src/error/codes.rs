#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    CommandFailed = 1,
    InvalidRule = 2,
    PathNotFound = 3,
    RuleDatabaseError = 4,
    ActionLogError = 5,
    ConfigError = 6,
    IoError = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}
