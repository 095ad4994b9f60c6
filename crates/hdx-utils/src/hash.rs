use std::{
    fs::File,
    io::{Cursor, Read},
    path::Path,
};

use calamine::{Reader, Xlsx};
use md5::{Digest, Md5};

use crate::error::{HashError, HashResult};

const CHUNK_SIZE: usize = 4096;
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

fn hex(hasher: Md5) -> String {
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// Hashes the cell values of an xlsx workbook row by row, so that resaving an
/// unchanged workbook keeps its hash.
fn hash_workbook(file_path: &Path, buffer: Vec<u8>) -> HashResult<String> {
    let workbook_failed = |err: calamine::XlsxError| {
        HashError::WorkbookFailed {
            path: file_path.to_path_buf(),
            reason: err.to_string(),
        }
    };

    let mut workbook = Xlsx::new(Cursor::new(buffer)).map_err(workbook_failed)?;
    let mut hasher = Md5::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(workbook_failed)?;
        for row in range.rows() {
            hasher.update(format!("{row:?}").as_bytes());
        }
    }
    Ok(hex(hasher))
}

/// Calculates the size and MD5 hash of a file.
///
/// The file is read in 4096 byte chunks. The hash is returned as a lowercase
/// hex string, which is the form the HDX filestore records in a resource's
/// `hash` field.
///
/// When `file_format` is `xlsx` and the file starts with a zip signature, the
/// hash covers the workbook's cell values rather than its bytes. Anything else
/// is hashed byte for byte.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the file cannot be opened or read.
/// * [`HashError::WorkbookFailed`] if an xlsx file cannot be parsed.
///
/// # Example
///
/// ```no_run
/// use hdx_utils::error::HashResult;
/// use hdx_utils::hash::get_size_and_hash;
///
/// fn main() -> HashResult<()> {
///     let (size, hash) = get_size_and_hash("/path/to/file.csv", "csv")?;
///     println!("{size} bytes, md5 {hash}");
///     Ok(())
/// }
/// ```
pub fn get_size_and_hash<P: AsRef<Path>>(
    file_path: P,
    file_format: &str,
) -> HashResult<(u64, String)> {
    let file_path = file_path.as_ref();
    let read_failed = |err| {
        HashError::ReadFailed {
            path: file_path.to_path_buf(),
            source: err,
        }
    };

    let mut file = File::open(file_path).map_err(read_failed)?;

    if file_format.eq_ignore_ascii_case("xlsx") {
        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(read_failed)?;
        let size = content.len() as u64;
        if content.starts_with(ZIP_SIGNATURE) {
            return Ok((size, hash_workbook(file_path, content)?));
        }
        let mut hasher = Md5::new();
        hasher.update(&content);
        return Ok((size, hex(hasher)));
    }

    let mut hasher = Md5::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut size = 0u64;
    loop {
        let read = file.read(&mut buffer).map_err(read_failed)?;
        if read == 0 {
            break;
        }
        size += read as u64;
        hasher.update(&buffer[..read]);
    }
    Ok((size, hex(hasher)))
}
