pub mod json_store; // JSON 文件存储（临时文件 + rename）
pub mod logging;
