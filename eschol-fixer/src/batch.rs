//! Drives one batch run: discover input files, correct every record,
//! back up the inputs, upload the aggregate output.
use crate::conf::Config;
use crate::correct;
use crate::correct::CanonicalSource;
use crate::drive;
use crate::drive::DriveFile;
use crate::drive::FileStore;
use crate::FixerError;
use crate::FixerResult;
use crate::RecordError;
use chrono::Local;
use marcrec::Record;
use std::env;
use std::fs;
use std::path::PathBuf;

const INPUT_NAME_PATTERN: &str = ".mrc";
const MARC_MIME: &str = "application/marc";

/// What the runner does when one record cannot be corrected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordPolicy {
    /// Stop the run.  Nothing is uploaded and unprocessed inputs stay put.
    Abort,
    /// Report the record, drop it from the output, keep going.
    Skip,
}

/// Counters and skip reasons for one completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_processed: usize,
    pub records_corrected: usize,
    /// (file name, failure) for each record dropped under [`RecordPolicy::Skip`].
    pub skipped: Vec<(String, RecordError)>,
    pub uploaded_file_id: Option<String>,
}

/// One end-to-end run over the configured folders.
pub struct BatchRunner<'a> {
    conf: &'a Config,
    policy: RecordPolicy,
    store: &'a mut dyn FileStore,
    source: &'a mut dyn CanonicalSource,
    run_date: String,
    staging_dir: PathBuf,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        conf: &'a Config,
        policy: RecordPolicy,
        store: &'a mut dyn FileStore,
        source: &'a mut dyn CanonicalSource,
    ) -> BatchRunner<'a> {
        BatchRunner {
            conf,
            policy,
            store,
            source,
            run_date: Local::now().format("%Y%m%d").to_string(),
            staging_dir: env::temp_dir(),
        }
    }

    /// Where the transient pre-upload file is staged.  Defaults to the
    /// OS temp directory.
    pub fn set_staging_dir(&mut self, dir: PathBuf) {
        self.staging_dir = dir;
    }

    pub fn run(&mut self) -> FixerResult<RunSummary> {
        let mut summary = RunSummary::default();

        let input_files = self
            .store
            .list_files(&self.conf.input_dir, INPUT_NAME_PATTERN)?;

        if input_files.is_empty() {
            println!("No input files found. Exiting.");
            return Ok(summary);
        }

        println!("Input files found:");
        for file in &input_files {
            println!("  {} ({})", file.name, file.id);
        }

        let backup_folder = self.store.create_folder(
            &self.conf.backup_dir,
            &format!("{}_input_files", self.run_date),
        )?;

        log::debug!("Created backup folder {backup_folder}");

        let mut corrected: Vec<Record> = Vec::new();

        for file in &input_files {
            self.process_file(file, &mut corrected, &mut summary)?;

            self.store
                .move_file(file, &self.conf.input_dir, &backup_folder)?;

            println!("Completed {}. Moved to backup folder.", file.name);
            summary.files_processed += 1;
        }

        summary.records_corrected = corrected.len();
        summary.uploaded_file_id = Some(self.upload(&corrected)?);

        Ok(summary)
    }

    /// Download and parse one input file, appending corrected records
    /// to the batch-wide collection in encounter order.
    fn process_file(
        &mut self,
        file: &DriveFile,
        corrected: &mut Vec<Record>,
        summary: &mut RunSummary,
    ) -> FixerResult<()> {
        println!("Processing file: {}", file.name);

        let bytes = self.store.download(file)?;

        for result in Record::from_binary_stream(bytes.as_slice()) {
            match self.correct_one(result) {
                Ok(record) => {
                    println!(
                        "Corrected 856 $u: {}",
                        record.get_field_values("856", "u").join(" ")
                    );
                    corrected.push(record);
                }
                Err(FixerError::Record(err)) => match self.policy {
                    RecordPolicy::Abort => {
                        eprintln!("Cannot correct record in {}: {err}", file.name);
                        return Err(err.into());
                    }
                    RecordPolicy::Skip => {
                        log::warn!("Skipping record in {}: {err}", file.name);
                        summary.skipped.push((file.name.clone(), err));
                    }
                },
                Err(err) => return Err(err), // transport failure, fatal
            }
        }

        Ok(())
    }

    /// Correct one parsed record, folding decode failures into the
    /// per-record error space so the policy applies to them too.
    fn correct_one(&mut self, parsed: Result<Record, String>) -> FixerResult<Record> {
        let mut record = parsed.map_err(RecordError::Parse)?;

        log::debug!(
            "Processing record 035 $9 {:?}",
            record.get_field_values("035", "9")
        );

        correct::correct_record(&mut record, self.source)?;

        Ok(record)
    }

    /// Serialize the batch output to a transient staging file, upload
    /// it, then drop the staging copy.
    fn upload(&mut self, records: &[Record]) -> FixerResult<String> {
        let staging = self.staging_dir.join(format!("{}_temp.mrc", self.run_date));

        let mut bytes: Vec<u8> = Vec::new();
        for record in records {
            bytes.extend(record.to_binary()?);
        }

        fs::write(&staging, &bytes)
            .map_err(|e| format!("Cannot write staging file {staging:?}: {e}"))?;

        let output_name = format!("{}_corrected_ucla_records.mrc", self.run_date);

        let uploaded = self
            .store
            .upload_file(&self.conf.output_dir, &output_name, MARC_MIME, &staging);

        // The staging copy is transient either way.
        fs::remove_file(&staging).ok();

        let file_id = uploaded?;

        println!("Corrected file uploaded: {}", drive::file_url(&file_id));

        Ok(file_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    const INPUT: &str = "input-folder";
    const OUTPUT: &str = "output-folder";
    const BACKUP: &str = "backup-folder";

    fn test_conf() -> Config {
        Config {
            input_dir: INPUT.to_string(),
            output_dir: OUTPUT.to_string(),
            backup_dir: BACKUP.to_string(),
            token_file: "unused".to_string(),
        }
    }

    /// Vector-backed stand-in for the Drive collaborator.
    #[derive(Default)]
    struct MemStore {
        /// folder id => (handle, content)
        folders: HashMap<String, Vec<(DriveFile, Vec<u8>)>>,
        created_folders: Vec<(String, String)>,
        /// (folder id, file name, content)
        uploads: Vec<(String, String, Vec<u8>)>,
        next_id: usize,
    }

    impl MemStore {
        fn add_file(&mut self, folder: &str, name: &str, content: Vec<u8>) {
            self.next_id += 1;
            let file = DriveFile {
                id: format!("file-{}", self.next_id),
                name: name.to_string(),
            };
            self.folders
                .entry(folder.to_string())
                .or_default()
                .push((file, content));
        }

        fn file_names(&self, folder: &str) -> Vec<String> {
            self.folders
                .get(folder)
                .map(|files| files.iter().map(|(f, _)| f.name.clone()).collect())
                .unwrap_or_default()
        }
    }

    impl FileStore for MemStore {
        fn list_files(
            &mut self,
            folder_id: &str,
            name_contains: &str,
        ) -> FixerResult<Vec<DriveFile>> {
            Ok(self
                .folders
                .get(folder_id)
                .map(|files| {
                    files
                        .iter()
                        .filter(|(f, _)| f.name.contains(name_contains))
                        .map(|(f, _)| f.clone())
                        .collect()
                })
                .unwrap_or_default())
        }

        fn create_folder(&mut self, parent_id: &str, name: &str) -> FixerResult<String> {
            self.next_id += 1;
            let id = format!("folder-{}", self.next_id);
            self.created_folders
                .push((parent_id.to_string(), name.to_string()));
            self.folders.insert(id.clone(), Vec::new());
            Ok(id)
        }

        fn download(&mut self, file: &DriveFile) -> FixerResult<Vec<u8>> {
            for files in self.folders.values() {
                if let Some((_, content)) = files.iter().find(|(f, _)| f.id == file.id) {
                    return Ok(content.clone());
                }
            }
            Err(format!("No such file: {}", file.id).into())
        }

        fn upload_file(
            &mut self,
            folder_id: &str,
            name: &str,
            _mime: &str,
            local_path: &Path,
        ) -> FixerResult<String> {
            let content = fs::read(local_path).map_err(|e| format!("{e}"))?;
            self.uploads
                .push((folder_id.to_string(), name.to_string(), content));
            self.next_id += 1;
            Ok(format!("upload-{}", self.next_id))
        }

        fn move_file(
            &mut self,
            file: &DriveFile,
            from_folder: &str,
            to_folder: &str,
        ) -> FixerResult<()> {
            let source = self
                .folders
                .get_mut(from_folder)
                .ok_or("No such source folder")?;

            let idx = source
                .iter()
                .position(|(f, _)| f.id == file.id)
                .ok_or("File not in source folder")?;

            let entry = source.remove(idx);

            self.folders
                .entry(to_folder.to_string())
                .or_default()
                .push(entry);

            Ok(())
        }
    }

    struct MapSource(HashMap<String, String>);

    impl MapSource {
        fn new(pairs: &[(&str, &str)]) -> MapSource {
            MapSource(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
        }
    }

    impl CanonicalSource for MapSource {
        fn canonical_id(&mut self, suffix: &str) -> FixerResult<Option<String>> {
            Ok(self.0.get(suffix).cloned())
        }
    }

    fn record_bytes(cross_ref: &str, title: &str) -> Vec<u8> {
        let mut record = Record::new();
        record.set_leader("00000cam a2200000 a 4500").unwrap();

        let field = record.add_data_field("035").unwrap();
        field.add_subfield("9", cross_ref).unwrap();

        let field = record.add_data_field("245").unwrap();
        field.add_subfield("a", title).unwrap();

        let field = record.add_data_field("856").unwrap();
        field
            .add_subfield("u", "http://proquest.example.org/broken")
            .unwrap();

        record.to_binary().unwrap()
    }

    fn staging_dir(test_name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("eschol-fixer-{test_name}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn empty_batch_exits_cleanly() {
        let mut store = MemStore::default();
        let mut source = MapSource::new(&[]);
        let conf = test_conf();

        let summary = BatchRunner::new(&conf, RecordPolicy::Abort, &mut store, &mut source)
            .run()
            .unwrap();

        assert_eq!(summary.files_processed, 0);
        assert!(summary.uploaded_file_id.is_none());
        assert!(store.created_folders.is_empty());
        assert!(store.uploads.is_empty());
    }

    #[test]
    fn end_to_end_two_records_in_order() {
        let mut store = MemStore::default();

        let mut content = record_bytes("(ZTUCLA)111111", "First title");
        content.extend(record_bytes("(ZTUCLA)222222", "Second title"));
        store.add_file(INPUT, "batch01.mrc", content);

        let mut source = MapSource::new(&[("111111", "qt1111111"), ("222222", "qt2222222")]);
        let conf = test_conf();

        let mut runner = BatchRunner::new(&conf, RecordPolicy::Abort, &mut store, &mut source);
        runner.set_staging_dir(staging_dir("end-to-end"));
        let summary = runner.run().unwrap();

        assert_eq!(summary.files_processed, 1);
        assert_eq!(summary.records_corrected, 2);
        assert!(summary.skipped.is_empty());
        assert!(summary.uploaded_file_id.is_some());

        // The input folder drained into the run's backup folder.
        assert!(store.file_names(INPUT).is_empty());
        let (backup_parent, backup_name) = &store.created_folders[0];
        assert_eq!(backup_parent, BACKUP);
        assert!(backup_name.ends_with("_input_files"));

        // One upload, carrying both corrected records in input order.
        assert_eq!(store.uploads.len(), 1);
        let (folder, name, bytes) = &store.uploads[0];
        assert_eq!(folder, OUTPUT);
        assert!(name.ends_with("_corrected_ucla_records.mrc"));

        let records: Vec<Record> = Record::from_binary_stream(bytes.as_slice())
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].get_field_values("856", "u"),
            vec!["http://escholarship.org/uc/item/1111111"]
        );
        assert_eq!(records[0].get_field_values("245", "a"), vec!["First title"]);
        assert_eq!(
            records[1].get_field_values("856", "u"),
            vec!["http://escholarship.org/uc/item/2222222"]
        );
    }

    #[test]
    fn not_found_aborts_batch() {
        let mut store = MemStore::default();
        store.add_file(INPUT, "good.mrc", record_bytes("(ZTUCLA)111111", "Resolvable"));
        store.add_file(INPUT, "bad.mrc", record_bytes("(ZTUCLA)999999", "Unresolvable"));

        let mut source = MapSource::new(&[("111111", "qt1111111")]);
        let conf = test_conf();

        let mut runner = BatchRunner::new(&conf, RecordPolicy::Abort, &mut store, &mut source);
        runner.set_staging_dir(staging_dir("not-found-abort"));
        let result = runner.run();

        match result {
            Err(FixerError::Record(RecordError::NotFound(suffix))) => {
                assert_eq!(suffix, "999999");
            }
            other => panic!("Expected NotFound abort, got {other:?}"),
        }

        // No artifact was produced and the failing file stayed put;
        // the file processed before the failure was already backed up.
        assert!(store.uploads.is_empty());
        assert_eq!(store.file_names(INPUT), vec!["bad.mrc"]);
    }

    #[test]
    fn skip_policy_drops_and_continues() {
        let mut store = MemStore::default();

        let mut content = record_bytes("(ZTUCLA)999999", "Unresolvable");
        content.extend(record_bytes("(ZTUCLA)111111", "Resolvable"));
        store.add_file(INPUT, "batch01.mrc", content);

        let mut source = MapSource::new(&[("111111", "qt1111111")]);
        let conf = test_conf();

        let mut runner = BatchRunner::new(&conf, RecordPolicy::Skip, &mut store, &mut source);
        runner.set_staging_dir(staging_dir("skip-policy"));
        let summary = runner.run().unwrap();

        assert_eq!(summary.records_corrected, 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].0, "batch01.mrc");
        assert!(matches!(summary.skipped[0].1, RecordError::NotFound(_)));

        let (_, _, bytes) = &store.uploads[0];
        let records: Vec<Record> = Record::from_binary_stream(bytes.as_slice())
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get_field_values("856", "u"),
            vec!["http://escholarship.org/uc/item/1111111"]
        );
    }
}
