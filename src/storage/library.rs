//! 文档库目录布局与文件状态判定
//!
//! 目录结构：
//! - `input_dir/<category>/<name>.pdf` 源文件
//! - `markdown_dir/<category>/<category>-<seq>.md` 阶段1产物
//! - `output_dir/<category>/<category>-<seq>.json` 阶段2产物
//!
//! `<seq>` 是源文件在分类内按文件名排序后的序号（从1开始，补齐三位），
//! 与已有的批量转换工具产出的文件名一致。分类内新增或删除源文件会改变
//! 其后文件的序号。
//!
//! 文件状态不做持久化，每次都根据产物是否存在即时计算。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::model::{derive_file_id, CategorySummary, FileStatus, SourceFile};
use crate::util::config::LibraryConfig;
use crate::util::logging::standards::events;
use crate::util::processing::{ProcessingError, ProcessingResult};

const MARKDOWN_EXTENSION: &str = "md";
const RECORD_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct Library {
    input_dir: PathBuf,
    markdown_dir: PathBuf,
    output_dir: PathBuf,
    extensions: Vec<String>,
}

impl Library {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        markdown_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            markdown_dir: markdown_dir.into(),
            output_dir: output_dir.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &LibraryConfig) -> Self {
        Self::new(
            &config.input_dir,
            &config.markdown_dir,
            &config.output_dir,
            config.extensions.clone(),
        )
    }

    /// 创建三个根目录（已存在时忽略）
    pub fn ensure_directories(&self) -> io::Result<()> {
        for dir in [&self.input_dir, &self.markdown_dir, &self.output_dir] {
            fs::create_dir_all(dir)?;
        }
        info!(
            event = events::LIBRARY_READY,
            input = %self.input_dir.display(),
            markdown = %self.markdown_dir.display(),
            output = %self.output_dir.display()
        );
        Ok(())
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// 派生产物的文件名主干
    pub fn artifact_id(category: &str, sequence: usize) -> String {
        format!("{category}-{sequence:03}")
    }

    pub fn markdown_path(&self, category: &str, sequence: usize) -> PathBuf {
        self.artifact_path(&self.markdown_dir, category, sequence, MARKDOWN_EXTENSION)
    }

    pub fn record_path(&self, category: &str, sequence: usize) -> PathBuf {
        self.artifact_path(&self.output_dir, category, sequence, RECORD_EXTENSION)
    }

    /// Markdown 产物对应的结构化记录路径（沿用 Markdown 的文件名主干）
    pub fn record_path_for_markup(&self, markup_path: &Path, category: &str) -> PathBuf {
        let stem = markup_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_dir
            .join(category)
            .join(format!("{stem}.{RECORD_EXTENSION}"))
    }

    fn artifact_path(&self, root: &Path, category: &str, sequence: usize, ext: &str) -> PathBuf {
        root.join(category)
            .join(format!("{}.{ext}", Self::artifact_id(category, sequence)))
    }

    /// 根据派生产物判定文件状态
    ///
    /// 文件不在分类中时视为 pending。
    pub fn status_of(&self, filename: &str, category: &str) -> FileStatus {
        match self.sequence_of(filename, category) {
            Some(sequence) => self.status_at(category, sequence),
            None => FileStatus::Pending,
        }
    }

    /// 结构化记录存在即为 completed，与 Markdown 是否存在无关。
    pub fn status_at(&self, category: &str, sequence: usize) -> FileStatus {
        if self.record_path(category, sequence).exists() {
            FileStatus::Completed
        } else if self.markdown_path(category, sequence).exists() {
            FileStatus::Markdown
        } else {
            FileStatus::Pending
        }
    }

    fn sequence_of(&self, filename: &str, category: &str) -> Option<usize> {
        let names = self.source_names(category).ok()?;
        names
            .iter()
            .position(|name| name == filename)
            .map(|index| index + 1)
    }

    /// 列出所有分类（按名称排序）
    pub fn categories(&self) -> ProcessingResult<Vec<String>> {
        if !self.input_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut categories = Vec::new();
        for entry in fs::read_dir(&self.input_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                categories.push(name);
            }
        }
        categories.sort();
        Ok(categories)
    }

    pub fn summaries(&self) -> ProcessingResult<Vec<CategorySummary>> {
        self.categories()?
            .iter()
            .map(|category| self.summary(category))
            .collect()
    }

    pub fn summary(&self, category: &str) -> ProcessingResult<CategorySummary> {
        let mut summary = CategorySummary::new(category);
        for file in self.list_files(category)? {
            summary.record(file.status);
        }
        Ok(summary)
    }

    /// 列出分类下的源文件，按文件名排序并编号
    pub fn list_files(&self, category: &str) -> ProcessingResult<Vec<SourceFile>> {
        let dir = self.input_dir.join(category);
        let files = self
            .source_names(category)?
            .into_iter()
            .enumerate()
            .map(|(index, filename)| {
                let sequence = index + 1;
                SourceFile {
                    id: derive_file_id(category, &filename),
                    status: self.status_at(category, sequence),
                    path: dir.join(&filename),
                    category: category.to_string(),
                    artifact_id: Self::artifact_id(category, sequence),
                    sequence,
                    filename,
                }
            })
            .collect();
        Ok(files)
    }

    fn source_names(&self, category: &str) -> ProcessingResult<Vec<String>> {
        validate_category(category)?;
        let dir = self.input_dir.join(category);
        if !dir.is_dir() {
            return Err(ProcessingError::UnknownCategory(category.to_string()));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if self.accepts(&path) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn list_all_files(&self) -> ProcessingResult<Vec<SourceFile>> {
        let mut files = Vec::new();
        for category in self.categories()? {
            files.extend(self.list_files(&category)?);
        }
        Ok(files)
    }

    pub fn find_file(&self, file_id: &str) -> ProcessingResult<SourceFile> {
        self.list_all_files()?
            .into_iter()
            .find(|file| file.id == file_id)
            .ok_or_else(|| ProcessingError::UnknownFile(file_id.to_string()))
    }

    /// 删除文件的派生产物，使其状态回到 pending
    pub fn clear_artifacts(&self, file: &SourceFile) -> ProcessingResult<()> {
        for path in [
            self.markdown_path(&file.category, file.sequence),
            self.record_path(&file.category, file.sequence),
        ] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "已删除派生产物"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}

/// 分类名称只能是单级目录名
pub fn validate_category(category: &str) -> ProcessingResult<()> {
    let invalid = category.is_empty()
        || category.starts_with('.')
        || category.contains(|c: char| c == '/' || c == '\\' || c == '\0');
    if invalid {
        return Err(ProcessingError::InvalidCategory(category.to_string()));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn library_in(dir: &TempDir) -> Library {
        let root = dir.path();
        Library::new(
            root.join("input"),
            root.join("markdown"),
            root.join("output"),
            vec!["pdf".to_string()],
        )
    }

    pub(crate) fn add_source(library: &Library, category: &str, filename: &str) {
        let dir = library.input_dir().join(category);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(filename), b"%PDF-1.7").unwrap();
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"{}").unwrap();
    }

    #[test]
    fn test_status_follows_artifacts() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);
        add_source(&library, "Req_2", "paper.pdf");

        assert_eq!(library.status_of("paper.pdf", "Req_2"), FileStatus::Pending);

        touch(&library.markdown_path("Req_2", 1));
        assert_eq!(library.status_of("paper.pdf", "Req_2"), FileStatus::Markdown);

        touch(&library.record_path("Req_2", 1));
        assert_eq!(library.status_of("paper.pdf", "Req_2"), FileStatus::Completed);
    }

    #[test]
    fn test_record_without_markdown_is_completed() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);
        add_source(&library, "Req_2", "paper.pdf");

        touch(&library.record_path("Req_2", 1));
        assert!(!library.markdown_path("Req_2", 1).exists());
        assert_eq!(library.status_of("paper.pdf", "Req_2"), FileStatus::Completed);
    }

    #[test]
    fn test_list_files_sorted_and_numbered() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);
        add_source(&library, "Req_1", "b.pdf");
        add_source(&library, "Req_1", "a.PDF");
        add_source(&library, "Req_1", "notes.txt");

        let files = library.list_files("Req_1").unwrap();
        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
        assert_eq!(files[0].sequence, 1);
        assert_eq!(files[1].sequence, 2);
        assert_eq!(files[1].id, derive_file_id("Req_1", "b.pdf"));
        assert_eq!(files[1].artifact_id, "Req_1-002");
    }

    #[test]
    fn test_existing_numbered_artifacts_are_recognised() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);
        add_source(&library, "Req_1", "alpha.pdf");
        add_source(&library, "Req_1", "beta.pdf");

        // 批量转换工具按 `{category}-{seq:03}` 命名产物
        touch(&dir.path().join("output/Req_1/Req_1-001.json"));
        touch(&dir.path().join("markdown/Req_1/Req_1-002.md"));

        assert_eq!(library.status_of("alpha.pdf", "Req_1"), FileStatus::Completed);
        assert_eq!(library.status_of("beta.pdf", "Req_1"), FileStatus::Markdown);
        assert_eq!(library.status_of("gamma.pdf", "Req_1"), FileStatus::Pending);

        let markup = library.markdown_path("Req_1", 2);
        assert_eq!(
            library.record_path_for_markup(&markup, "Req_1"),
            library.record_path("Req_1", 2)
        );
    }

    #[test]
    fn test_summary_counts() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);
        add_source(&library, "Req_1", "a.pdf");
        add_source(&library, "Req_1", "b.pdf");
        add_source(&library, "Req_1", "c.pdf");
        touch(&library.markdown_path("Req_1", 2));
        touch(&library.record_path("Req_1", 3));

        let summary = library.summary("Req_1").unwrap();
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.markdown, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_find_and_clear() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);
        add_source(&library, "Req_1", "a.pdf");
        add_source(&library, "Req_2", "a.pdf");
        touch(&library.markdown_path("Req_2", 1));
        touch(&library.record_path("Req_2", 1));

        let file = library.find_file(&derive_file_id("Req_2", "a.pdf")).unwrap();
        assert_eq!(file.category, "Req_2");
        assert_eq!(file.status, FileStatus::Completed);

        library.clear_artifacts(&file).unwrap();
        assert_eq!(library.status_of("a.pdf", "Req_2"), FileStatus::Pending);
        // 重复清理不报错
        library.clear_artifacts(&file).unwrap();
    }

    #[test]
    fn test_unknown_and_invalid_lookups() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);
        library.ensure_directories().unwrap();

        assert!(matches!(
            library.find_file("000000000000"),
            Err(ProcessingError::UnknownFile(_))
        ));
        assert!(matches!(
            library.list_files("missing"),
            Err(ProcessingError::UnknownCategory(_))
        ));
        assert!(matches!(
            library.list_files("../etc"),
            Err(ProcessingError::InvalidCategory(_))
        ));
        assert!(library.categories().unwrap().is_empty());
    }
}
