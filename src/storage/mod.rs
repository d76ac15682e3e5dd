// 文档库存储层：目录布局、派生产物与文件状态

pub mod library;

pub use library::{validate_category, Library};
