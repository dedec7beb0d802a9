// src/analysis/status.rs
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Empty,
    Inited,
    Initializing,
    Running,
    Complete,
    Aborting,
    Aborted,
    ValidationError,
    SaveImg,
    EditImg,
    RewriteImgs,
    FatalError,
}

impl Status {
    /// Name used in the analysis document. `Aborting` has no name of its
    /// own and is written as "fatalError".
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Empty => "empty",
            Status::Inited => "waiting",
            Status::Initializing => "initializing",
            Status::Running => "running",
            Status::Complete => "complete",
            Status::Aborted => "aborted",
            Status::ValidationError => "validationError",
            Status::SaveImg => "SaveImg",
            Status::EditImg => "EditImg",
            Status::RewriteImgs => "RewriteImgs",
            Status::Aborting | Status::FatalError => "fatalError",
        }
    }

    /// Unknown names parse to `FatalError`.
    pub fn parse(name: &str) -> Status {
        match name {
            "empty" => Status::Empty,
            "waiting" => Status::Inited,
            "initializing" => Status::Initializing,
            "running" => Status::Running,
            "complete" => Status::Complete,
            "aborted" => Status::Aborted,
            "validationError" => Status::ValidationError,
            "SaveImg" => Status::SaveImg,
            "EditImg" => Status::EditImg,
            "RewriteImgs" => Status::RewriteImgs,
            _ => Status::FatalError,
        }
    }

    pub fn is_waiting_for_backend(&self) -> bool {
        matches!(
            self,
            Status::Inited
                | Status::Initializing
                | Status::Running
                | Status::SaveImg
                | Status::EditImg
                | Status::RewriteImgs
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
