use std::path::{Path, PathBuf};

use photo_fs::fs::{FsError, OpenMode, PhotoFs};
use photo_fs::storage::{Database, PhotoId, PhotoRecord};
use photo_fs::views::naming::photo_name;
use photo_fs::views::{Entry, ViewRegistry};

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    db: Database,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("photos");
        std::fs::create_dir_all(&root).unwrap();
        let db = Database::open(dir.path().join("data"), &root).unwrap();
        assert!(db.try_acquire_write_lock().unwrap());
        Self {
            _dir: dir,
            root,
            db,
        }
    }

    fn add(&self, name: &str, datetime: &str, contents: &[u8]) -> PhotoId {
        let path = self.root.join(name);
        std::fs::write(&path, contents).unwrap();
        let record = PhotoRecord {
            path: path.to_string_lossy().into_owned(),
            datetime: datetime.to_string(),
            last_modified: "20240101000000".to_string(),
            year: datetime[0..4].to_string(),
            month: datetime[4..6].to_string(),
            day: datetime[6..8].to_string(),
            f: None,
            iso: None,
            make: None,
            camera: None,
            focal_length: None,
            lens_model: None,
            lens_spec: None,
            label: None,
        };
        self.db.store_photo(&record, &[]).unwrap()
    }

    fn fs(&self) -> PhotoFs {
        PhotoFs::new(self.db.clone(), ViewRegistry::new(self.db.clone(), "select")).unwrap()
    }
}

fn photo_path(id: PhotoId) -> String {
    format!("/date/2013/all/{}", photo_name(id, 1, 1))
}

fn read_all(fs: &PhotoFs, path: &str) -> Vec<u8> {
    let fh = fs.open(path, OpenMode::Read).unwrap();
    let data = fs.read(fh, 1 << 16, 0).unwrap();
    fs.release(fh).unwrap();
    data
}

#[test]
fn test_root_lists_views() {
    let fx = Fixture::new();
    let fs = fx.fs();
    assert_eq!(
        fs.list_children("/").unwrap(),
        vec!["date", "albums", "tags", "camera"]
    );
    assert_eq!(fs.resolve_attributes("/").unwrap(), Entry::Directory);
    assert_eq!(fs.resolve_attributes("/tags").unwrap(), Entry::Directory);
}

#[test]
fn test_unknown_view_is_not_found() {
    let fx = Fixture::new();
    let fs = fx.fs();
    assert!(matches!(
        fs.resolve_attributes("/people/bob"),
        Err(FsError::NotFound)
    ));
    assert!(matches!(fs.list_children("/people"), Err(FsError::NotFound)));
}

#[test]
fn test_lists_through_views() {
    let fx = Fixture::new();
    let id = fx.add("a.jpg", "20130704100000", b"abc");
    let fs = fx.fs();

    assert_eq!(fs.list_children("/date").unwrap(), vec!["2013"]);
    assert_eq!(
        fs.list_children("/date/2013/all/").unwrap(),
        vec![photo_name(id, 1, 1)]
    );
}

#[test]
fn test_read_with_offsets() {
    let fx = Fixture::new();
    let id = fx.add("a.jpg", "20130704100000", b"0123456789");
    let fs = fx.fs();

    match fs.resolve_attributes(&photo_path(id)).unwrap() {
        Entry::RealFile(attrs) => assert_eq!(attrs.size, 10),
        other => panic!("expected a file, got {other:?}"),
    }

    let fh = fs.open(&photo_path(id), OpenMode::Read).unwrap();
    assert_eq!(fs.read(fh, 4, 3).unwrap(), b"3456");
    assert_eq!(fs.read(fh, 100, 8).unwrap(), b"89");
    assert!(fs.read(fh, 4, 50).unwrap().is_empty());
    fs.release(fh).unwrap();

    assert!(matches!(fs.read(fh, 1, 0), Err(FsError::BadHandle(_))));
}

#[test]
fn test_write_in_place() {
    let fx = Fixture::new();
    let id = fx.add("a.jpg", "20130704100000", b"0123456789");
    let fs = fx.fs();

    let fh = fs.open(&photo_path(id), OpenMode::Write).unwrap();
    assert_eq!(fs.write(fh, b"ab", 2).unwrap(), 2);
    fs.release(fh).unwrap();

    assert_eq!(std::fs::read(fx.root.join("a.jpg")).unwrap(), b"01ab456789");
}

#[test]
fn test_truncate_real_photo() {
    let fx = Fixture::new();
    let id = fx.add("a.jpg", "20130704100000", b"0123456789");
    let fs = fx.fs();

    fs.truncate(&photo_path(id), 4).unwrap();
    assert_eq!(std::fs::read(fx.root.join("a.jpg")).unwrap(), b"0123");
}

#[test]
fn test_directories_cannot_be_opened() {
    let fx = Fixture::new();
    fx.add("a.jpg", "20130704100000", b"x");
    let fs = fx.fs();
    assert!(matches!(
        fs.open("/date/2013", OpenMode::Read),
        Err(FsError::IsDirectory)
    ));
}

#[test]
fn test_unlink_is_a_noop() {
    let fx = Fixture::new();
    let id = fx.add("a.jpg", "20130704100000", b"x");
    let fs = fx.fs();

    fs.unlink(&photo_path(id)).unwrap();
    assert!(fx.root.join("a.jpg").exists());
    assert!(fx.db.has_photo(&fx.root.join("a.jpg").to_string_lossy()).unwrap());
}

#[test]
fn test_write_back_through_sibling() {
    let fx = Fixture::new();
    let id = fx.add("a.jpg", "20130704100000", b"original");
    let fs = fx.fs();
    let target = photo_path(id);
    let sibling = format!("{target}4821");

    // The sibling looks like an empty regular file before it is written
    match fs.resolve_attributes(&sibling).unwrap() {
        Entry::RealFile(attrs) => {
            assert_eq!(attrs.size, 0);
            assert_eq!(attrs.mode, 0o100644);
        }
        other => panic!("expected a file, got {other:?}"),
    }

    let fh = fs.create(&sibling).unwrap();
    fs.write(fh, b"edited!", 0).unwrap();
    fs.release(fh).unwrap();
    assert_eq!(read_all(&fs, &sibling), b"edited!");

    fs.rename(&sibling, &target).unwrap();

    assert_eq!(std::fs::read(fx.root.join("a.jpg")).unwrap(), b"edited!");
    assert_eq!(read_all(&fs, &target), b"edited!");
}

#[test]
fn test_sibling_of_unknown_photo_is_not_found() {
    let fx = Fixture::new();
    let fs = fx.fs();
    assert_eq!(
        fs.resolve_attributes("/date/2013/all/1 (0x99).jpg12").unwrap(),
        Entry::NotFound
    );
    assert!(matches!(
        fs.create("/date/2013/all/1 (0x99).jpg12"),
        Err(FsError::NotPermitted)
    ));
}

#[test]
fn test_plain_rename_is_refused() {
    let fx = Fixture::new();
    let a = fx.add("a.jpg", "20130704100000", b"a");
    let b = fx.add("b.jpg", "20130704110000", b"b");
    let fs = fx.fs();

    let from = format!("/date/2013/all/{}", photo_name(a, 1, 2));
    let to = format!("/date/2013/all/{}", photo_name(b, 2, 2));
    assert!(matches!(fs.rename(&from, &to), Err(FsError::NotPermitted)));
    assert_eq!(std::fs::read(fx.root.join("b.jpg")).unwrap(), b"b");
}

fn read_only_copy(fx: &Fixture) -> PhotoFs {
    let data = fx.db.path().parent().map(Path::to_path_buf).unwrap();
    let db = Database::open(data, &fx.root).unwrap();
    assert!(!db.try_acquire_write_lock().unwrap());
    PhotoFs::new(db.clone(), ViewRegistry::new(db, "select")).unwrap()
}

#[test]
fn test_read_only_instance_serves_reads_and_refuses_writes() {
    let fx = Fixture::new();
    let id = fx.add("a.jpg", "20130704100000", b"original");
    let fs = read_only_copy(&fx);
    assert!(!fs.is_writable());

    assert_eq!(read_all(&fs, &photo_path(id)), b"original");
    assert!(matches!(
        fs.open(&photo_path(id), OpenMode::ReadWrite),
        Err(FsError::ReadOnly)
    ));
    assert!(matches!(
        fs.truncate(&photo_path(id), 0),
        Err(FsError::ReadOnly)
    ));
    assert!(matches!(
        fs.create(&format!("{}1", photo_path(id))),
        Err(FsError::ReadOnly)
    ));
    assert_eq!(std::fs::read(fx.root.join("a.jpg")).unwrap(), b"original");
}
