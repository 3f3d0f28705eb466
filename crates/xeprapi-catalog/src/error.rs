/// Errors that can occur while building the catalogue.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    /// The peer refused to hand out its function list.
    #[error("unable to retrieve API function list (status {0})")]
    Functions(i32),

    /// The peer refused to hand out its command list.
    #[error("unable to retrieve Xepr command list (status {0})")]
    Commands(i32),

    /// A table is shorter than the advertised entry count.
    #[error("malformed {table} table: {detail}")]
    Malformed { table: &'static str, detail: String },
}

pub type Result<T> = std::result::Result<T, CatalogueError>;
