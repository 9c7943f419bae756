//! Command-line contract of the `vfs` binary: exit codes and stdout

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn vfs(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vfs"))
        .args(args)
        .current_dir(cwd)
        .env_remove("VFS_LOG")
        .output()
        .expect("failed to run vfs")
}

fn code(output: &Output) -> i32 {
    output.status.code().expect("vfs terminated by signal")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Workspace {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        vfs(args, self.path())
    }

    fn write(&self, name: &str, len: usize) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, vec![b'x'; len]).unwrap();
        path
    }
}

#[test]
fn test_create_and_report() {
    let ws = Workspace::new();

    assert_eq!(code(&ws.run(&["archive", "create", "2", "4"])), 0);
    assert!(ws.path().join("archive.structure").exists());
    assert_eq!(
        std::fs::metadata(ws.path().join("archive.store")).unwrap().len(),
        8
    );

    let free = ws.run(&["archive", "free"]);
    assert_eq!(code(&free), 0);
    assert_eq!(stdout(&free), "8\n");

    let used = ws.run(&["archive", "used"]);
    assert_eq!(code(&used), 0);
    assert_eq!(stdout(&used), "0\n");

    let list = ws.run(&["archive", "list"]);
    assert_eq!(code(&list), 0);
    assert_eq!(stdout(&list), "");
}

#[test]
fn test_create_existing_archive() {
    let ws = Workspace::new();
    assert_eq!(code(&ws.run(&["archive", "create", "2", "4"])), 0);
    assert_eq!(code(&ws.run(&["archive", "create", "2", "4"])), 3);
}

#[test]
fn test_missing_archive() {
    let ws = Workspace::new();
    ws.write("vfs.c", 10);

    for args in [
        vec!["nope", "add", "vfs.c", "vfs.c"],
        vec!["nope", "get", "vfs.c", "out"],
        vec!["nope", "del", "vfs.c"],
        vec!["nope", "free"],
        vec!["nope", "used"],
        vec!["nope", "list"],
    ] {
        let output = ws.run(&args);
        assert_eq!(code(&output), 2, "args: {:?}", args);
        assert!(output.stdout.is_empty());
    }
}

#[test]
fn test_add_get_del_lifecycle() {
    let ws = Workspace::new();
    ws.write("vfs.c", 1500);

    assert_eq!(code(&ws.run(&["archive", "create", "4096", "4"])), 0);
    assert_eq!(code(&ws.run(&["archive", "add", "vfs.c", "vfs.c"])), 0);
    assert_eq!(code(&ws.run(&["archive", "add", "vfs.c", "vfs.c"])), 11);

    assert_eq!(stdout(&ws.run(&["archive", "list"])), "vfs.c,1500,1,0,0\n");
    assert_eq!(stdout(&ws.run(&["archive", "used"])), "1500\n");
    assert_eq!(stdout(&ws.run(&["archive", "free"])), "14884\n");

    assert_eq!(code(&ws.run(&["archive", "get", "vfs.c", "copy.c"])), 0);
    assert_eq!(
        std::fs::read(ws.path().join("copy.c")).unwrap(),
        std::fs::read(ws.path().join("vfs.c")).unwrap()
    );

    assert_eq!(code(&ws.run(&["archive", "get", "2.txt", "out"])), 21);
    assert_eq!(code(&ws.run(&["archive", "del", "vfs.c"])), 0);
    assert_eq!(code(&ws.run(&["archive", "del", "vfs.c"])), 21);
    assert_eq!(stdout(&ws.run(&["archive", "list"])), "");
}

#[test]
fn test_missing_source() {
    let ws = Workspace::new();
    assert_eq!(code(&ws.run(&["archive", "create", "4096", "4"])), 0);
    assert_eq!(
        code(&ws.run(&["archive", "add", "tmp/does_not_exist", "hi"])),
        13
    );
}

#[test]
fn test_out_of_space() {
    let ws = Workspace::new();
    ws.write("big", 20480);

    assert_eq!(code(&ws.run(&["archive", "create", "8192", "4"])), 0);
    assert_eq!(code(&ws.run(&["archive", "add", "big", "first"])), 0);
    assert_eq!(stdout(&ws.run(&["archive", "free"])), "12288\n");
    assert_eq!(code(&ws.run(&["archive", "add", "big", "second"])), 12);

    ws.write("huge", 40000);
    assert_eq!(code(&ws.run(&["archive", "add", "huge", "huge"])), 12);
}

#[test]
fn test_unwritable_destination() {
    let ws = Workspace::new();
    ws.write("data", 10);

    assert_eq!(code(&ws.run(&["archive", "create", "16", "4"])), 0);
    assert_eq!(code(&ws.run(&["archive", "add", "data", "data"])), 0);
    assert_eq!(
        code(&ws.run(&["archive", "get", "data", "missing/dir/out"])),
        30
    );
}

#[test]
fn test_listing_order() {
    let ws = Workspace::new();
    assert_eq!(code(&ws.run(&["archive", "create", "50", "1000"])), 0);

    for name in ["file0", "file1", "file2"] {
        ws.write(name, 76);
        assert_eq!(code(&ws.run(&["archive", "add", name, name])), 0);
    }

    assert_eq!(
        stdout(&ws.run(&["archive", "list"])),
        "file0,76,2,0,1\nfile1,76,2,2,3\nfile2,76,2,4,5\n"
    );
}

#[test]
fn test_usage_errors() {
    let ws = Workspace::new();

    assert_eq!(code(&ws.run(&[])), 66);
    assert_eq!(code(&ws.run(&["archive"])), 66);
    assert_eq!(code(&ws.run(&["archive", "bogus"])), 66);
    assert_eq!(code(&ws.run(&["archive", "create", "ten", "4"])), 66);
    assert_eq!(code(&ws.run(&["archive", "create", "0", "4"])), 66);
    assert_eq!(code(&ws.run(&["archive", "add", "only-source"])), 66);
    assert!(!ws.path().join("archive.structure").exists());
}

#[test]
fn test_help_exits_zero() {
    let ws = Workspace::new();
    let output = ws.run(&["--help"]);
    assert_eq!(code(&output), 0);
    assert!(stdout(&output).contains("create"));
}

#[test]
fn test_corrupt_structure() {
    let ws = Workspace::new();
    assert_eq!(code(&ws.run(&["archive", "create", "16", "4"])), 0);

    std::fs::write(ws.path().join("archive.structure"), b"garbage").unwrap();
    let output = ws.run(&["archive", "list"]);
    assert_eq!(code(&output), 4);
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("vfs: "));
}

#[test]
fn test_archive_named_like_a_command() {
    let ws = Workspace::new();
    ws.write("data", 5);

    for name in ["list", "add", "free", "help", "create"] {
        assert_eq!(code(&ws.run(&[name, "create", "2", "4"])), 0, "archive {}", name);
        assert_eq!(code(&ws.run(&[name, "add", "data", "data"])), 0, "archive {}", name);

        let list = ws.run(&[name, "list"]);
        assert_eq!(code(&list), 0, "archive {}", name);
        assert_eq!(stdout(&list), "data,5,3,0,2\n");

        assert_eq!(stdout(&ws.run(&[name, "free"])), "3\n");
        assert!(ws.path().join(format!("{}.structure", name)).exists());
    }
}

#[test]
fn test_get_into_archive_files_is_refused() {
    let ws = Workspace::new();
    ws.write("data", 10);

    assert_eq!(code(&ws.run(&["a", "create", "16", "4"])), 0);
    assert_eq!(code(&ws.run(&["a", "add", "data", "data"])), 0);

    assert_eq!(code(&ws.run(&["a", "get", "data", "a.store"])), 30);
    assert_eq!(code(&ws.run(&["a", "get", "data", "a.structure"])), 30);

    assert_eq!(
        std::fs::metadata(ws.path().join("a.store")).unwrap().len(),
        64
    );
    let list = ws.run(&["a", "list"]);
    assert_eq!(code(&list), 0);
    assert_eq!(stdout(&list), "data,10,1,0,0\n");
}

#[cfg(unix)]
#[test]
fn test_structure_mode_survives_updates() {
    use std::os::unix::fs::PermissionsExt;

    let ws = Workspace::new();
    ws.write("data", 10);
    assert_eq!(code(&ws.run(&["a", "create", "16", "4"])), 0);

    let structure = ws.path().join("a.structure");
    std::fs::set_permissions(&structure, std::fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(code(&ws.run(&["a", "add", "data", "data"])), 0);
    assert_eq!(code(&ws.run(&["a", "del", "data"])), 0);

    let mode = std::fs::metadata(&structure).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}
