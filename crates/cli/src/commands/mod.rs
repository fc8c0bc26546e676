pub mod delete;
pub mod get;
pub mod info;
pub mod init;
pub mod list;
pub mod upload;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Configure the storage backend
    Init(init::InitArgs),
    /// Upload one or more images
    Upload(upload::UploadArgs),
    /// List stored images
    List(list::ListArgs),
    /// Download stored images
    Get(get::GetArgs),
    /// Delete stored images
    Delete(delete::DeleteArgs),
    /// Show size and content type of stored images
    Info(info::InfoArgs),
}
