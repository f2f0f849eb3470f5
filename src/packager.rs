//! Data URI to binary file conversion

use crate::{Error, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

/// MIME type assumed when the data URI header does not name one
pub const DEFAULT_MIME: &str = "image/png";

/// Standard alphabet, accepting payloads with or without `=` padding
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Named binary payload ready for a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl PackagedFile {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decode a base64 data URI into a file named `file_name`.
///
/// The MIME type is read from between the first `:` and the following `;` of
/// the header and defaults to [`DEFAULT_MIME`]. A URI without a comma has no
/// payload and yields an empty file. Whitespace inside the payload (line
/// wrapping) is ignored and trailing `=` padding is optional.
///
/// # Examples
///
/// ```
/// let file = resume_export::data_url_to_file("data:image/jpeg;base64,AAEC", "a.jpg").unwrap();
/// assert_eq!(file.mime, "image/jpeg");
/// assert_eq!(file.bytes, vec![0, 1, 2]);
/// ```
pub fn data_url_to_file(data_uri: &str, file_name: &str) -> Result<PackagedFile> {
    let (header, payload) = match data_uri.split_once(',') {
        Some((h, p)) => (h, p),
        None => (data_uri, ""),
    };

    let mime = header
        .split_once(':')
        .and_then(|(_, rest)| rest.split_once(';'))
        .map(|(mime, _)| mime)
        .map(str::trim)
        .filter(|m| !m.is_empty());
    let mime = match mime {
        Some(m) => m.to_string(),
        None => {
            log::warn!("data URI for {} has no MIME type, assuming {}", file_name, DEFAULT_MIME);
            DEFAULT_MIME.to_string()
        }
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = LENIENT
        .decode(compact)
        .map_err(|e| Error::MalformedPayload(format!("{}: {}", file_name, e)))?;

    Ok(PackagedFile {
        name: file_name.to_string(),
        mime,
        bytes,
    })
}
