use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const FILE_ID_LEN: usize = 12;

/// 由分类和文件名推导稳定的文件ID
///
/// 同一文件始终得到同一个ID，重复入队和查询都是幂等的。
pub fn derive_file_id(category: &str, filename: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_bytes());
    hasher.update(b"/");
    hasher.update(filename.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..FILE_ID_LEN].to_string()
}

/// 队列中的单个处理任务，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTask {
    pub job_id: String,
    pub file_id: String,
    pub filename: String,
    pub category: String,
    pub source_path: PathBuf,
    /// 分类内按文件名排序后的序号（从1开始），传给阶段1
    pub sequence: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_is_stable() {
        let first = derive_file_id("Req_2", "paper.pdf");
        let second = derive_file_id("Req_2", "paper.pdf");
        assert_eq!(first, second);
        assert_eq!(first.len(), FILE_ID_LEN);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_file_id_depends_on_category() {
        assert_ne!(
            derive_file_id("Req_1", "paper.pdf"),
            derive_file_id("Req_2", "paper.pdf")
        );
        assert_ne!(derive_file_id("ab", "c.pdf"), derive_file_id("a", "bc.pdf"));
    }
}
