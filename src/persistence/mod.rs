//! 文件元数据 SQLite 存储
//!
//! 记录每次成功上传的文件信息，支持按上传时间倒序的分页查询

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// 已上传文件记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    /// 记录ID
    pub id: String,
    /// 原始文件名
    pub name: String,
    /// 资源地址
    pub url: String,
    /// 字节大小
    pub size: u64,
    /// MIME 类型
    #[serde(rename = "type")]
    pub mime: String,
    /// 上传时间 (Unix 毫秒)
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: i64,
}

impl FileRecord {
    /// 创建新记录，上传时间取当前时刻
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        size: u64,
        mime: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            size,
            mime: mime.into(),
            uploaded_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// 文件列表分页响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListPage {
    pub files: Vec<FileRecord>,
    pub total: u64,
    pub page: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

/// 元数据存储管理器
pub struct FileMetaStore {
    /// SQLite 连接
    conn: Mutex<Connection>,
}

impl FileMetaStore {
    /// 打开（或创建）数据库文件
    pub fn new(db_path: &Path) -> Result<Self> {
        // 确保父目录存在
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        info!("元数据存储已打开: {:?}", db_path);
        Ok(store)
    }

    /// 内存数据库（测试用）
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    /// 初始化数据库表
    fn init_tables(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                size INTEGER NOT NULL,
                mime TEXT NOT NULL,
                uploaded_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_files_uploaded_at ON files(uploaded_at)",
            [],
        )?;

        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("获取数据库锁失败: {}", e))
    }

    /// 写入一条记录
    pub fn insert(&self, record: &FileRecord) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO files (id, name, url, size, mime, uploaded_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.name,
                record.url,
                record.size as i64,
                record.mime,
                record.uploaded_at,
            ],
        )?;
        Ok(())
    }

    /// 分页查询，按上传时间倒序
    ///
    /// page 从 1 开始；total_pages 为 ceil(total / limit)，无记录时为 0
    pub fn list_page(&self, page: u32, limit: u32) -> Result<FileListPage> {
        let page = page.max(1);
        let limit = limit.max(1);
        let offset = (page as u64 - 1) * limit as u64;

        let conn = self.lock_conn()?;

        let total: u64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u64)
        })?;

        let mut stmt = conn.prepare(
            "SELECT id, name, url, size, mime, uploaded_at FROM files \
             ORDER BY uploaded_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
        )?;
        let files = stmt
            .query_map(params![limit as i64, offset as i64], |row| {
                Ok(FileRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    url: row.get(2)?,
                    size: row.get::<_, i64>(3)? as u64,
                    mime: row.get(4)?,
                    uploaded_at: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total_pages = ((total + limit as u64 - 1) / limit as u64) as u32;

        Ok(FileListPage {
            files,
            total,
            page,
            total_pages,
        })
    }

    /// 记录总数
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock_conn()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(total as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, uploaded_at: i64) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            url: format!("http://h/storage/uploads/{}", name),
            size: 1024,
            mime: "image/png".to_string(),
            uploaded_at,
        }
    }

    #[test]
    fn test_insert_and_count() {
        let store = FileMetaStore::in_memory().unwrap();
        assert_eq!(store.count().unwrap(), 0);

        store.insert(&record("a.png", 1000)).unwrap();
        store.insert(&record("b.png", 2000)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_pagination_with_twelve_records() {
        // 12 条记录、每页 5 条：第 2 页返回 5 条，total=12，totalPages=3
        let store = FileMetaStore::in_memory().unwrap();
        for i in 0..12 {
            store.insert(&record(&format!("f{}.png", i), i)).unwrap();
        }

        let page = store.list_page(2, 5).unwrap();
        assert_eq!(page.files.len(), 5);
        assert_eq!(page.total, 12);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 3);

        // 最后一页只剩 2 条
        let last = store.list_page(3, 5).unwrap();
        assert_eq!(last.files.len(), 2);
    }

    #[test]
    fn test_ordering_is_newest_first() {
        let store = FileMetaStore::in_memory().unwrap();
        store.insert(&record("old.png", 1000)).unwrap();
        store.insert(&record("newest.png", 3000)).unwrap();
        store.insert(&record("mid.png", 2000)).unwrap();

        let page = store.list_page(1, 10).unwrap();
        let names: Vec<&str> = page.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["newest.png", "mid.png", "old.png"]);
    }

    #[test]
    fn test_empty_store() {
        let store = FileMetaStore::in_memory().unwrap();
        let page = store.list_page(1, 5).unwrap();
        assert!(page.files.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_page_beyond_range_is_empty() {
        let store = FileMetaStore::in_memory().unwrap();
        store.insert(&record("a.png", 1)).unwrap();

        let page = store.list_page(9, 5).unwrap();
        assert!(page.files.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("meta/filebox.db");

        {
            let store = FileMetaStore::new(&db_path).unwrap();
            store.insert(&record("a.png", 42)).unwrap();
        }

        let reopened = FileMetaStore::new(&db_path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert_eq!(reopened.list_page(1, 5).unwrap().files[0].name, "a.png");
    }

    #[test]
    fn test_record_wire_format() {
        let rec = FileRecord {
            id: "x".to_string(),
            name: "a.png".to_string(),
            url: "http://h/a.png".to_string(),
            size: 7,
            mime: "image/png".to_string(),
            uploaded_at: 99,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "image/png");
        assert_eq!(json["uploadedAt"], 99);
    }
}
