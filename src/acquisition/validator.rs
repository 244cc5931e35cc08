//! PDF文件校验：只检查文件头魔数，不做完整解析

use std::path::Path;
use tokio::io::AsyncReadExt;

pub const PDF_MAGIC: &[u8; 5] = b"%PDF-";

/// 文件存在、为非空普通文件且以 `%PDF-` 开头时返回true。任何IO错误都视为校验失败。
pub async fn validate_pdf(path: &Path) -> bool {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(_) => {
            tracing::warn!(path = %path.display(), "文件不存在");
            return false;
        }
    };
    if !metadata.is_file() || metadata.len() == 0 {
        tracing::warn!(path = %path.display(), "不是非空的普通文件");
        return false;
    }

    let mut header = [0u8; 5];
    let read = async {
        let mut file = tokio::fs::File::open(path).await?;
        file.read_exact(&mut header).await?;
        Ok::<_, std::io::Error>(())
    }
    .await;

    match read {
        Ok(()) if &header == PDF_MAGIC => true,
        Ok(()) => {
            tracing::warn!(path = %path.display(), "文件不是以PDF文件头开始");
            false
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "打开PDF文件出错");
            false
        }
    }
}
