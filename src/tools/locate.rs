//! 可执行文件定位：PATH → 配置的搜索目录 → 常见安装位置

use std::path::{Path, PathBuf};

/// 常见的手动安装目录（相对 HOME 或绝对路径）
fn fallback_locations(program: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = home_dir() {
        if program == "massdns" {
            paths.push(home.join("pentest/OSINT/massdns/bin/massdns"));
        }
        paths.push(home.join("pentest/OSINT").join(program));
        paths.push(home.join("tools").join(program));
    }
    paths.push(PathBuf::from("/usr/local/bin").join(program));
    paths.push(PathBuf::from("/opt").join(program).join(program));
    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// 展开前导 `~/`
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// 定位可执行文件；program 含路径分隔符时只检查该路径本身
pub fn locate_binary(program: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let as_path = expand_home(Path::new(program));
    if program.contains('/') || program.starts_with('~') {
        return is_executable(&as_path).then_some(as_path);
    }

    let path_dirs = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect::<Vec<_>>())
        .unwrap_or_default();

    path_dirs
        .into_iter()
        .chain(search_paths.iter().map(|p| expand_home(p)))
        .map(|dir| dir.join(program))
        .chain(fallback_locations(program))
        .find(|candidate| is_executable(candidate))
}
