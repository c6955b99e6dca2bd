use std::path::{Path, PathBuf};

pub fn replace_homedir_to_tilde(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    let Some(home_dir) = ::dirs::home_dir() else {
        return path
    };
    path.strip_prefix(home_dir)
        .map(|path| Path::new("~").join(path))
        .unwrap_or(path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tilde_only_under_home() {
        let Some(home) = ::dirs::home_dir() else {
            return
        };
        assert_eq!(
            replace_homedir_to_tilde(home.join("work/tests.txt")),
            Path::new("~/work/tests.txt")
        );
        assert_eq!(
            replace_homedir_to_tilde("/nonexistent-root/x"),
            Path::new("/nonexistent-root/x")
        );
    }
}
