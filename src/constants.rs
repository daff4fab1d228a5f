//! Protocol constants shared by the document model, the importer and the CLI.

/// `User-Agent` sent with local uploads. The communication server checks
/// for the substring `local`.
pub const LOCAL_UPLOAD_USER_AGENT: &str = "Braintacle_local_upload";

/// `Content-Type` of an uploaded inventory stream.
pub const COMPRESSED_CONTENT_TYPE: &str = "application/x-compress";

/// Fixed value of the `QUERY` element in an inventory request.
pub const INVENTORY_QUERY: &str = "INVENTORY";

/// Schema file shipped for inventory request documents.
pub const INVENTORY_REQUEST_SCHEMA: &str = "InventoryRequest.rng";

/// Default offset for group cache expiration timestamps (12 hours).
pub const DEFAULT_GROUP_CACHE_EXPIRATION_SECONDS: i64 = 43_200;

/// Element names of an inventory request.
pub mod elements {
    pub const REQUEST: &str = "REQUEST";
    pub const DEVICEID: &str = "DEVICEID";
    pub const QUERY: &str = "QUERY";
    pub const CONTENT: &str = "CONTENT";
    pub const HARDWARE: &str = "HARDWARE";
    pub const BIOS: &str = "BIOS";
    pub const ACCOUNTINFO: &str = "ACCOUNTINFO";
    pub const KEYNAME: &str = "KEYNAME";
    pub const KEYVALUE: &str = "KEYVALUE";
    pub const DOWNLOAD: &str = "DOWNLOAD";
    pub const HISTORY: &str = "HISTORY";
    pub const PACKAGE: &str = "PACKAGE";
    pub const ID: &str = "ID";
}

/// Exit codes of the command line tool.
pub mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
    /// The document did not pass schema validation.
    pub const INVALID_DOCUMENT: u8 = 2;
    /// Input file missing or unreadable.
    pub const INPUT_UNREADABLE: u8 = 10;
    /// Input is not a valid compressed stream.
    pub const INVALID_STREAM: u8 = 11;
}
