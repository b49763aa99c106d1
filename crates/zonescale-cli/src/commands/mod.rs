pub mod evaluate;
pub mod init;
pub mod report;
pub mod run;
pub mod snapshot;
pub mod validate;
