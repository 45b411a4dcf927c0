//! ZipArchiver - ローカルディレクトリに `<task-id>.zip` を作る Archiver 実装
//!
//! 書き込みは `<task-id>.zip.part` に対して行い、finish が成功してから
//! `<task-id>.zip` に rename する。途中で失敗した場合は .part を消すだけなので、
//! `locate` が書きかけのファイルを返すことはない。

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::domain::{ArchiveError, TaskId, unique_entry_name};
use crate::ports::{ArchiveLocation, Archiver};

pub struct ZipArchiver {
    dir: PathBuf,
}

impl ZipArchiver {
    /// 保存先ディレクトリを（無ければ）作成する
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ArchiveError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(id: TaskId) -> String {
        format!("{id}.zip")
    }

    fn location(&self, id: TaskId) -> ArchiveLocation {
        let file_name = Self::file_name(id);
        ArchiveLocation {
            path: self.dir.join(&file_name),
            file_name,
        }
    }
}

/// Entry names never carry directories.
fn sanitize(name: &str) -> &str {
    match name.rsplit(['/', '\\']).find(|s| !s.is_empty() && *s != "..") {
        Some(base) => base,
        None => "file",
    }
}

fn write_entries(path: &Path, entries: BTreeMap<String, Bytes>) -> Result<(), ArchiveError> {
    let file = File::create(path).map_err(|source| ArchiveError::CreateFile {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut used = HashSet::with_capacity(entries.len());

    for (name, data) in entries {
        let entry = unique_entry_name(sanitize(&name), &mut used);
        if let Err(err) = writer.start_file(entry.as_str(), options) {
            return Err(ArchiveError::WriteEntry {
                entry,
                source: std::io::Error::other(err),
            });
        }
        if let Err(source) = writer.write_all(&data) {
            return Err(ArchiveError::WriteEntry { entry, source });
        }
    }

    let file = writer.finish().map_err(|err| ArchiveError::Finish {
        path: path.to_path_buf(),
        source: std::io::Error::other(err),
    })?;
    file.sync_all().map_err(|source| ArchiveError::Finish {
        path: path.to_path_buf(),
        source,
    })
}

fn write_archive(
    dir: &Path,
    location: &ArchiveLocation,
    entries: BTreeMap<String, Bytes>,
) -> Result<(), ArchiveError> {
    std::fs::create_dir_all(dir).map_err(|source| ArchiveError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let part = dir.join(format!("{}.part", location.file_name));
    if let Err(err) = write_entries(&part, entries) {
        let _ = std::fs::remove_file(&part);
        return Err(err);
    }

    std::fs::rename(&part, &location.path).map_err(|source| {
        let _ = std::fs::remove_file(&part);
        ArchiveError::Finish {
            path: location.path.clone(),
            source,
        }
    })
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(
        &self,
        id: TaskId,
        entries: BTreeMap<String, Bytes>,
    ) -> Result<ArchiveLocation, ArchiveError> {
        let dir = self.dir.clone();
        let location = self.location(id);

        // zip の書き込みは同期 I/O なので blocking スレッドに逃がす
        let written = location.clone();
        tokio::task::spawn_blocking(move || write_archive(&dir, &written, entries))
            .await
            .map_err(|e| ArchiveError::Join(e.to_string()))??;

        tracing::debug!(task_id = %id, path = %location.path.display(), "archive written");
        Ok(location)
    }

    async fn locate(&self, id: TaskId) -> Option<ArchiveLocation> {
        let location = self.location(id);
        match tokio::fs::metadata(&location.path).await {
            Ok(meta) if meta.is_file() => Some(location),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use ulid::Ulid;

    fn entries(items: &[(&str, &'static [u8])]) -> BTreeMap<String, Bytes> {
        items
            .iter()
            .map(|(name, data)| (name.to_string(), Bytes::from_static(data)))
            .collect()
    }

    fn read_zip(path: &Path) -> BTreeMap<String, String> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut out = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            let mut content = String::new();
            file.read_to_string(&mut content).unwrap();
            out.insert(file.name().to_string(), content);
        }
        out
    }

    #[tokio::test]
    async fn archive_contains_one_entry_per_blob() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = ZipArchiver::new(dir.path()).unwrap();
        let id = TaskId::from_ulid(Ulid::new());

        let location = archiver
            .archive(id, entries(&[("a.jpg", b"alpha"), ("b.jpg", b"bravo")]))
            .await
            .unwrap();

        assert_eq!(location.file_name, format!("{id}.zip"));
        let contents = read_zip(&location.path);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents["a.jpg"], "alpha");
        assert_eq!(contents["b.jpg"], "bravo");
        assert!(!dir.path().join(format!("{id}.zip.part")).exists());
        assert_eq!(archiver.locate(id).await, Some(location));
    }

    #[tokio::test]
    async fn empty_set_still_produces_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = ZipArchiver::new(dir.path()).unwrap();
        let id = TaskId::from_ulid(Ulid::new());

        let location = archiver.archive(id, BTreeMap::new()).await.unwrap();

        assert!(read_zip(&location.path).is_empty());
    }

    #[tokio::test]
    async fn directory_is_created_when_missing() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested/archives");
        let archiver = ZipArchiver::new(&dir).unwrap();
        assert!(dir.is_dir());

        std::fs::remove_dir_all(&dir).unwrap();
        let id = TaskId::from_ulid(Ulid::new());
        archiver
            .archive(id, entries(&[("a.jpg", b"alpha")]))
            .await
            .unwrap();

        assert!(dir.join(format!("{id}.zip")).is_file());
    }

    #[tokio::test]
    async fn directory_failure_leaves_no_result() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("archives");
        let archiver = ZipArchiver::new(&dir).unwrap();

        // 保存先をファイルで塞ぐ
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, b"not a directory").unwrap();

        let id = TaskId::from_ulid(Ulid::new());
        let err = archiver
            .archive(id, entries(&[("a.jpg", b"alpha")]))
            .await
            .unwrap_err();

        assert!(matches!(err, ArchiveError::CreateDir { .. }));
        assert_eq!(archiver.locate(id).await, None);
    }

    #[tokio::test]
    async fn locate_unknown_task_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = ZipArchiver::new(dir.path()).unwrap();
        assert_eq!(archiver.locate(TaskId::from_ulid(Ulid::new())).await, None);
    }

    #[tokio::test]
    async fn entry_names_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = ZipArchiver::new(dir.path()).unwrap();
        let id = TaskId::from_ulid(Ulid::new());

        let location = archiver
            .archive(id, entries(&[("../../etc/x.jpg", b"one"), ("x.jpg", b"two")]))
            .await
            .unwrap();

        let names: Vec<String> = read_zip(&location.path).into_keys().collect();
        assert_eq!(names, vec!["x-1.jpg", "x.jpg"]);
    }
}
