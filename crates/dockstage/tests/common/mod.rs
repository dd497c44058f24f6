use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_manifest(&self, content: &str) {
        fs::write(self.root.path().join("dockstage.kdl"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// 呼び出し引数を docker.log に記録する偽の docker
    ///
    /// `build` では `build_output` を出力し、`push` は `push_exit` で終了する。
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn fake_docker(&self, build_output: &str, push_exit: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            "#!/bin/sh\n\
             echo \"$@\" >> '{log}'\n\
             case \"$1\" in\n\
             build)\n\
             cat <<'OUT'\n\
             {build_output}\n\
             OUT\n\
             ;;\n\
             push)\n\
             exit {push_exit}\n\
             ;;\n\
             esac\n\
             exit 0\n",
            log = self.log_path().display(),
        );

        let path = self.root.path().join("fake-docker");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[allow(dead_code)]
    pub fn log_path(&self) -> PathBuf {
        self.root.path().join("docker.log")
    }

    /// docker.log の各行（1行 = 1回の呼び出し）
    #[allow(dead_code)]
    pub fn docker_calls(&self) -> Vec<String> {
        read_lines(&self.log_path())
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
