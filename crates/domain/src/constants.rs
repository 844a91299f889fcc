//! Protocol constants
//!
//! Sizes, paths and header names shared by the transfer and authentication
//! layers.

// Sizes
pub const MIB: u64 = 1 << 20;
/// Part size used for session uploads and ranged downloads.
pub const DEFAULT_PART_SIZE: u64 = 5 * MIB;
/// Largest payload accepted by the single-request upload.
pub const MULTIPART_UPLOAD_MAX_SIZE: u64 = 50 * MIB;
/// Size of each pull a buffered reader issues against its source.
pub const BUFFER_PULL_SIZE: usize = 64 * 1024;

// API paths
pub const FILES_PATH: &str = "filebox/files";
pub const SESSIONS_PATH: &str = "filebox/sessions";
pub const AUTH_TOKEN_PATH: &str = "/auth/token";

// Headers
pub const API_KEY_HEADER: &str = "X-Api-Key";
pub const API_VERSION_HEADER: &str = "X-Api-Version";
pub const API_VERSION: &str = "1";
pub const CLIENT_NAME: &str = "cloudsdk-client";
