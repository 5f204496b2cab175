pub mod ask;
pub mod auto;
pub mod chat;
pub mod init;
pub mod skills;
