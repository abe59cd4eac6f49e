//! Identity document uploads and their delayed verification.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use rocket::{
    fs::TempFile,
    http::ContentType,
    tokio::{self, sync::Mutex, time::Duration},
};

use crate::{
    error::{Error, Result},
    model::mongodb::Id,
    scheduled_task::ScheduledTask,
    store::{Result as StoreResult, Storage},
    Config,
};

/// Largest accepted document, in bytes.
pub const MAX_DOCUMENT_SIZE: u64 = 5 * 1024 * 1024;

/// Wait before the first retry of a failed verification update.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// File formats accepted as identity documents.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DocumentFormat {
    Jpeg,
    Png,
    Pdf,
}

impl DocumentFormat {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    fn from_content_type(content_type: &ContentType) -> Option<Self> {
        // `image/jpg` is not registered, but clients send it anyway.
        let is_jpg = content_type.top() == "image" && content_type.sub() == "jpg";
        if content_type.is_jpeg() || is_jpg {
            Some(Self::Jpeg)
        } else if content_type.is_png() {
            Some(Self::Png)
        } else if content_type.is_pdf() {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    /// Extension used for stored files of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

/// Check an uploaded file's size, name and declared type.
///
/// The extension and the content type are checked independently; each must
/// name an accepted format. The format named by the extension is returned.
pub fn check_upload(
    size: u64,
    file_name: Option<&str>,
    content_type: Option<&ContentType>,
) -> Result<DocumentFormat> {
    if size == 0 {
        return Err(Error::validation("No file uploaded"));
    }
    if size > MAX_DOCUMENT_SIZE {
        return Err(Error::validation("Document too large - maximum 5MB allowed"));
    }
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .and_then(DocumentFormat::from_extension);
    let from_type = content_type.and_then(DocumentFormat::from_content_type);
    match (from_name, from_type) {
        (Some(format), Some(_)) => Ok(format),
        _ => Err(Error::validation(
            "Only image files (jpeg, jpg, png) and PDFs are allowed",
        )),
    }
}

/// Stores uploaded identity documents and marks their owners verified after
/// the configured delay.
///
/// At most one verification is pending per voter; a new upload replaces it.
pub struct DocumentVerifier {
    storage: Storage,
    upload_dir: PathBuf,
    delay: Duration,
    retries: u32,
    pending: Mutex<HashMap<Id, ScheduledTask<()>>>,
}

impl DocumentVerifier {
    pub fn new(storage: Storage, config: &Config) -> Self {
        Self {
            storage,
            upload_dir: config.upload_dir().to_path_buf(),
            delay: config.verification_delay(),
            retries: config.verification_retries(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Validate and store a voter's identity document, then schedule their
    /// verification. Returns once the file is stored, without waiting for
    /// the verification.
    pub async fn submit(&self, voter_id: Id, document: &mut TempFile<'_>) -> Result<PathBuf> {
        if self.storage.voter(voter_id).await?.is_none() {
            return Err(Error::not_found(format!("Voter with ID '{voter_id}'")));
        }
        let file_name = document
            .raw_name()
            .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str());
        let format = check_upload(document.len(), file_name, document.content_type())?;

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(stored_file_name(format));
        document.move_copy_to(&path).await?;
        debug!("Stored document for voter {voter_id} at {}", path.display());

        self.schedule(voter_id, path.to_string_lossy().into_owned())
            .await;
        Ok(path)
    }

    /// Schedule verification of the given voter, replacing any pending one.
    async fn schedule(&self, voter_id: Id, document_path: String) {
        let mut pending = self.pending.lock().await;
        pending.retain(|_, task| !task.is_finished());
        if let Some(previous) = pending.remove(&voter_id) {
            previous.cancel().await;
            debug!("Replaced pending verification for voter {voter_id}");
        }
        let task = verify(self.storage.clone(), voter_id, document_path, self.retries);
        pending.insert(voter_id, ScheduledTask::new(task, self.delay));
    }

    /// Run the voter's pending verification now and wait for it.
    /// Returns false if nothing was pending.
    #[cfg(test)]
    pub async fn finish_pending(&self, voter_id: Id) -> bool {
        let task = self.pending.lock().await.remove(&voter_id);
        match task {
            Some(task) => {
                task.trigger_now();
                task.await.is_ok()
            }
            None => false,
        }
    }
}

/// Mark the voter verified, retrying failed updates with doubling backoff.
async fn verify(storage: Storage, voter_id: Id, document_path: String, retries: u32) {
    let outcome = with_retries(retries, INITIAL_BACKOFF, |attempt| {
        if attempt > 0 {
            warn!("Retrying verification of voter {voter_id} (retry {attempt} of {retries})");
        }
        storage.mark_verified(voter_id, &document_path)
    })
    .await;
    match outcome {
        Ok(true) => info!("Verified identity document of voter {voter_id}"),
        Ok(false) => warn!("Voter {voter_id} disappeared before their document was verified"),
        Err(e) => error!("Giving up verifying voter {voter_id}: {e}"),
    }
}

/// Run `operation` until it succeeds, retrying at most `retries` times.
/// The wait before each retry doubles, starting from `backoff`.
/// The operation is passed the number of the attempt, starting from zero.
async fn with_retries<T, F, Fut>(retries: u32, mut backoff: Duration, mut operation: F) -> StoreResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Err(e) if attempt < retries => {
                debug!("Attempt {attempt} failed: {e}");
                attempt += 1;
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            result => return result,
        }
    }
}

/// A fresh, unpredictable name for a stored document.
fn stored_file_name(format: DocumentFormat) -> String {
    let millis = Utc::now().timestamp_millis();
    let random: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{millis}-{random}.{}", format.extension())
}
