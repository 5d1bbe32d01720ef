use axum::Router;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// 在随机端口启动一个临时 HTTP 服务，返回 base url
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// 测试用的临时目录，drop 时连同内容一起删除
pub fn temp_dir(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(&format!("{}_", prefix))
        .tempdir()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_is_removed_on_drop() {
        let dir = temp_dir("cleanup");
        let path = dir.path().to_path_buf();
        std::fs::create_dir_all(path.join("app_1_abc")).unwrap();
        std::fs::write(path.join("app_1_abc").join("icon.png"), [1u8, 2, 3]).unwrap();
        assert!(path.exists());

        drop(dir);
        assert!(!path.exists());
    }
}
