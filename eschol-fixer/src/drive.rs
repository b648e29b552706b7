//! Google Drive file-store collaborator.
use crate::FixerResult;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD: &str = "https://www.googleapis.com/upload/drive/v3";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Max time we'll wait for a response to an HTTP request.
const DEFAULT_HTTP_REQUEST_TIMEOUT: u64 = 60;

const MULTIPART_BOUNDARY: &str = "marc_record_upload";

/// Handle to one object in the file store.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
}

/// The file-store operations the batch runner consumes.
pub trait FileStore {
    /// List files under a folder whose names contain the given pattern.
    fn list_files(&mut self, folder_id: &str, name_contains: &str) -> FixerResult<Vec<DriveFile>>;

    /// Create a folder under a parent folder; returns the new folder id.
    fn create_folder(&mut self, parent_id: &str, name: &str) -> FixerResult<String>;

    /// Fetch a file's full content into memory.
    fn download(&mut self, file: &DriveFile) -> FixerResult<Vec<u8>>;

    /// Create a file from local content; returns the new file id.
    fn upload_file(
        &mut self,
        folder_id: &str,
        name: &str,
        mime: &str,
        local_path: &Path,
    ) -> FixerResult<String>;

    /// Reparent a file from one folder to another.
    fn move_file(&mut self, file: &DriveFile, from_folder: &str, to_folder: &str)
        -> FixerResult<()>;
}

/// Drive v3 client over a pre-provisioned OAuth bearer token.
///
/// Auth flows live outside this tool; we only read the access token
/// from an authorized-user JSON file.
pub struct GoogleDrive {
    token: String,
    client: reqwest::blocking::Client,
}

impl GoogleDrive {
    /// Build a client from the token file at the provided path.
    pub fn from_token_file(path: &str) -> FixerResult<GoogleDrive> {
        let text = fs::read_to_string(path).map_err(|e| {
            format!("No token file at {path}; cannot connect to google drive: {e}")
        })?;

        let parsed: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| format!("Token file {path} is not valid JSON: {e}"))?;

        let token = parsed["token"]
            .as_str()
            .ok_or_else(|| format!("Token file {path} has no 'token' value"))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_REQUEST_TIMEOUT))
            .build()
            .map_err(|e| format!("Error building HTTP client: {e}"))?;

        Ok(GoogleDrive {
            token: token.to_string(),
            client,
        })
    }

    /// Verify a response status, returning the response for the caller
    /// to consume.
    fn check(context: &str, response: Response) -> FixerResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().unwrap_or_default();

        Err(format!("{context} failed: HTTP {status}: {body}").into())
    }

    /// Verify a response and parse its JSON body.
    fn read_json(context: &str, response: Response) -> FixerResult<serde_json::Value> {
        let response = Self::check(context, response)?;

        let text = response
            .text()
            .map_err(|e| format!("{context}: cannot read response: {e}"))?;

        serde_json::from_str(&text)
            .map_err(|e| format!("{context}: response is not valid JSON: {e}").into())
    }
}

impl FileStore for GoogleDrive {
    fn list_files(&mut self, folder_id: &str, name_contains: &str) -> FixerResult<Vec<DriveFile>> {
        let query = search_query(folder_id, name_contains);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        // One page per iteration until the listing reports no
        // continuation token.
        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", "nextPageToken, files(id, name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];

            if let Some(ref token) = page_token {
                params.push(("pageToken", token.as_str()));
            }

            let response = self
                .client
                .get(format!("{DRIVE_API}/files"))
                .bearer_auth(&self.token)
                .query(&params)
                .send()
                .map_err(|e| format!("Drive file listing failed: {e}"))?;

            let body = Self::read_json("Drive file listing", response)?;

            if let Some(entries) = body["files"].as_array() {
                for entry in entries {
                    let (Some(id), Some(name)) = (entry["id"].as_str(), entry["name"].as_str())
                    else {
                        return Err("Drive listing entry has no id/name".into());
                    };

                    files.push(DriveFile {
                        id: id.to_string(),
                        name: name.to_string(),
                    });
                }
            }

            page_token = body["nextPageToken"].as_str().map(|s| s.to_string());

            if page_token.is_none() {
                break;
            }
        }

        Ok(files)
    }

    fn create_folder(&mut self, parent_id: &str, name: &str) -> FixerResult<String> {
        let metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [parent_id],
        });

        let response = self
            .client
            .post(format!("{DRIVE_API}/files"))
            .bearer_auth(&self.token)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .header(CONTENT_TYPE, "application/json")
            .body(metadata.to_string())
            .send()
            .map_err(|e| format!("Drive folder creation failed: {e}"))?;

        let body = Self::read_json("Drive folder creation", response)?;

        match body["id"].as_str() {
            Some(id) => Ok(id.to_string()),
            None => Err("Drive folder creation returned no id".into()),
        }
    }

    fn download(&mut self, file: &DriveFile) -> FixerResult<Vec<u8>> {
        let response = self
            .client
            .get(format!("{DRIVE_API}/files/{}", file.id))
            .bearer_auth(&self.token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .map_err(|e| format!("Download failed for {}: {e}", file.name))?;

        let response = Self::check("Drive file download", response)?;

        let bytes = response
            .bytes()
            .map_err(|e| format!("Error reading content of {}: {e}", file.name))?;

        Ok(bytes.to_vec())
    }

    fn upload_file(
        &mut self,
        folder_id: &str,
        name: &str,
        mime: &str,
        local_path: &Path,
    ) -> FixerResult<String> {
        let content = fs::read(local_path)
            .map_err(|e| format!("Cannot read staging file {local_path:?}: {e}"))?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [folder_id],
        });

        let response = self
            .client
            .post(format!("{DRIVE_UPLOAD}/files"))
            .bearer_auth(&self.token)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id"),
                ("supportsAllDrives", "true"),
            ])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(multipart_related(&metadata.to_string(), mime, &content))
            .send()
            .map_err(|e| format!("Upload failed for {name}: {e}"))?;

        let body = Self::read_json("Drive file upload", response)?;

        match body["id"].as_str() {
            Some(id) => Ok(id.to_string()),
            None => Err("Drive file upload returned no id".into()),
        }
    }

    fn move_file(
        &mut self,
        file: &DriveFile,
        from_folder: &str,
        to_folder: &str,
    ) -> FixerResult<()> {
        let response = self
            .client
            .patch(format!("{DRIVE_API}/files/{}", file.id))
            .bearer_auth(&self.token)
            .query(&[
                ("addParents", to_folder),
                ("removeParents", from_folder),
                ("supportsAllDrives", "true"),
            ])
            .header(CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .map_err(|e| format!("Move failed for {}: {e}", file.name))?;

        Self::check("Drive file move", response).map(|_| ())
    }
}

/// Public link for an uploaded file, for the run summary.
pub fn file_url(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}")
}

/// Drive search term for files in a folder with a name substring.
fn search_query(folder_id: &str, name_contains: &str) -> String {
    format!("'{folder_id}' in parents and name contains '{name_contains}'")
}

/// Compose a multipart/related request body: a JSON metadata part
/// followed by the media part.
fn multipart_related(metadata: &str, mime: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();

    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {metadata}\r\n"
        )
        .as_bytes(),
    );

    body.extend_from_slice(
        format!("--{MULTIPART_BOUNDARY}\r\nContent-Type: {mime}\r\n\r\n").as_bytes(),
    );

    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_shape() {
        assert_eq!(
            search_query("folder123", ".mrc"),
            "'folder123' in parents and name contains '.mrc'"
        );
    }

    #[test]
    fn multipart_body_carries_both_parts() {
        let body = multipart_related(r#"{"name":"f.mrc"}"#, "application/marc", b"\x1D");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with("--marc_record_upload\r\n"));
        assert!(text.contains("Content-Type: application/json; charset=UTF-8"));
        assert!(text.contains(r#"{"name":"f.mrc"}"#));
        assert!(text.contains("Content-Type: application/marc"));
        assert!(text.ends_with("\r\n--marc_record_upload--\r\n"));
    }
}
