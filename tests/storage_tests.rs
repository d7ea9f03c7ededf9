use std::sync::Arc;
use std::thread;

use photo_fs::storage::{Column, Database, DatabaseError, Filter, PhotoRecord};

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data"), dir.path()).unwrap();
    assert!(db.try_acquire_write_lock().unwrap());
    (dir, db)
}

fn sample_photo(path: &str, datetime: &str) -> PhotoRecord {
    PhotoRecord {
        path: path.to_string(),
        datetime: datetime.to_string(),
        last_modified: "20240101120000".to_string(),
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
    }
}

fn with_label(mut photo: PhotoRecord, label: &str) -> PhotoRecord {
    photo.label = Some(label.to_string());
    photo
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|t| t.to_string()).collect()
}

#[test]
fn test_fresh_index_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data"), dir.path()).unwrap();
    assert!(db.is_empty());
    assert!(!db.is_writable());
    assert!(db.years().unwrap().is_empty());

    let reopened = Database::open(dir.path().join("data"), dir.path()).unwrap();
    assert!(!reopened.is_empty());
}

#[test]
fn test_each_root_gets_its_own_index() {
    let dir = tempfile::tempdir().unwrap();
    let a = Database::open(dir.path().join("data"), &dir.path().join("a")).unwrap();
    let b = Database::open(dir.path().join("data"), &dir.path().join("b")).unwrap();
    assert_ne!(a.path(), b.path());
    assert!(a.path().extension().is_some_and(|e| e == "db"));
}

#[test]
fn test_store_and_read_back() {
    let (_dir, db) = test_db();
    let mut photo = sample_photo("/photos/a.jpg", "20130704101500");
    photo.f = Some("2.8".to_string());
    photo.camera = Some("X100".to_string());

    let id = db.store_photo(&photo, &tags(&["Beach"])).unwrap();

    assert_eq!(db.photo(id).unwrap(), Some(photo));
    assert_eq!(
        db.real_path(id).unwrap(),
        Some(std::path::PathBuf::from("/photos/a.jpg"))
    );
    assert!(db.has_photo("/photos/a.jpg").unwrap());
    assert_eq!(db.tags().unwrap(), vec!["beach"]);
}

#[test]
fn test_writes_refused_while_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data"), dir.path()).unwrap();

    let err = db
        .store_photo(&sample_photo("/photos/a.jpg", "20130704101500"), &[])
        .unwrap_err();
    assert!(matches!(err, DatabaseError::ReadOnly));
    assert!(matches!(
        db.delete_photo("/photos/a.jpg"),
        Err(DatabaseError::ReadOnly)
    ));
}

#[test]
fn test_delete_removes_tags() {
    let (_dir, db) = test_db();
    db.store_photo(
        &sample_photo("/photos/a.jpg", "20130704101500"),
        &tags(&["a", "b"]),
    )
    .unwrap();

    assert!(db.delete_photo("/photos/a.jpg").unwrap());

    assert!(db.tag_associations("/photos/a.jpg").unwrap().is_empty());
    assert!(db.tags().unwrap().is_empty());
    assert!(!db.has_photo("/photos/a.jpg").unwrap());
}

#[test]
fn test_ids_are_never_reused() {
    let (_dir, db) = test_db();
    let first = db
        .store_photo(&sample_photo("/photos/a.jpg", "20130704101500"), &[])
        .unwrap();
    db.delete_photo("/photos/a.jpg").unwrap();
    let second = db
        .store_photo(&sample_photo("/photos/a.jpg", "20130704101500"), &[])
        .unwrap();

    assert!(second > first);
    assert_eq!(db.real_path(first).unwrap(), None);
}

#[test]
fn test_date_aggregates() {
    let (_dir, db) = test_db();
    db.store_photo(&sample_photo("/p/1.jpg", "20120105080000"), &[]).unwrap();
    db.store_photo(&sample_photo("/p/2.jpg", "20130704101500"), &[]).unwrap();
    db.store_photo(&sample_photo("/p/3.jpg", "20130702090000"), &[]).unwrap();
    db.store_photo(&sample_photo("/p/4.jpg", "20131225000000"), &[]).unwrap();

    assert_eq!(db.years().unwrap(), vec!["2013", "2012"]);
    assert_eq!(db.months("2013").unwrap(), vec!["07", "12"]);
    assert_eq!(db.days("2013", "07").unwrap(), vec!["02", "04"]);
    assert!(db.months("1999").unwrap().is_empty());
}

#[test]
fn test_listings_follow_capture_time() {
    let (_dir, db) = test_db();
    let late = db.store_photo(&sample_photo("/p/late.jpg", "20130704180000"), &[]).unwrap();
    let early = db.store_photo(&sample_photo("/p/early.jpg", "20130704060000"), &[]).unwrap();
    let other_day = db.store_photo(&sample_photo("/p/other.jpg", "20130701120000"), &[]).unwrap();

    assert_eq!(db.photos_by_year("2013").unwrap(), vec![other_day, early, late]);
    assert_eq!(db.photos_by_month("2013", "07").unwrap(), vec![other_day, early, late]);
    assert_eq!(db.photos_by_day("2013", "07", "04").unwrap(), vec![early, late]);
}

#[test]
fn test_labels_and_selects() {
    let (_dir, db) = test_db();
    let plain = db
        .store_photo(&with_label(sample_photo("/p/1.jpg", "20130704100000"), "Trip"), &[])
        .unwrap();
    let chosen = db
        .store_photo(
            &with_label(sample_photo("/p/2.jpg", "20130704110000"), "Trip"),
            &tags(&["Select"]),
        )
        .unwrap();
    db.store_photo(
        &with_label(sample_photo("/p/3.jpg", "20130704120000"), "Home"),
        &tags(&["select"]),
    )
    .unwrap();

    assert_eq!(db.labels().unwrap(), vec!["Home", "Trip"]);
    assert_eq!(db.photos_by_label("Trip").unwrap(), vec![plain, chosen]);
    assert_eq!(db.photos_by_label_and_tag("Trip", "select").unwrap(), vec![chosen]);
}

#[test]
fn test_tag_conjunction() {
    let (_dir, db) = test_db();
    let ab = db
        .store_photo(&sample_photo("/p/1.jpg", "20130704100000"), &tags(&["a", "b"]))
        .unwrap();
    let a = db
        .store_photo(&sample_photo("/p/2.jpg", "20130704090000"), &tags(&["a"]))
        .unwrap();

    assert_eq!(db.photos_by_tags(&tags(&["a"])).unwrap(), vec![a, ab]);
    assert_eq!(db.photos_by_tags(&tags(&["A", "b"])).unwrap(), vec![ab]);
    assert!(db.photos_by_tags(&tags(&["a", "c"])).unwrap().is_empty());
    assert!(db.photos_by_tags(&[]).unwrap().is_empty());
}

#[test]
fn test_attribute_filters() {
    let (_dir, db) = test_db();
    let mut one = sample_photo("/p/1.jpg", "20130704100000");
    one.f = Some("2.8".to_string());
    one.iso = Some("100".to_string());
    let mut two = sample_photo("/p/2.jpg", "20130704110000");
    two.f = Some("2.8".to_string());
    two.iso = Some("200".to_string());
    let three = sample_photo("/p/3.jpg", "20130704120000");

    let one = db.store_photo(&one, &[]).unwrap();
    let two = db.store_photo(&two, &[]).unwrap();
    let three = db.store_photo(&three, &[]).unwrap();

    assert_eq!(db.attribute_values(Column::FNumber).unwrap(), vec!["2.8"]);
    assert_eq!(db.attribute_values(Column::Iso).unwrap(), vec!["100", "200"]);
    assert!(db.is_attribute_value_valid(Column::Iso, "200").unwrap());
    assert!(!db.is_attribute_value_valid(Column::FNumber, "9.9").unwrap());

    let f = Filter::new().eq(Column::FNumber, "2.8");
    assert_eq!(db.photos_matching(&f).unwrap(), vec![one, two]);
    assert_eq!(
        db.photos_matching(&f.clone().eq(Column::Iso, "200")).unwrap(),
        vec![two]
    );
    assert_eq!(db.photos_matching(&Filter::new()).unwrap(), vec![one, two, three]);
}

#[test]
fn test_all_last_modified() {
    let (_dir, db) = test_db();
    db.store_photo(&sample_photo("/p/1.jpg", "20130704100000"), &[]).unwrap();

    let stamps = db.all_last_modified().unwrap();
    assert_eq!(stamps.len(), 1);
    assert_eq!(stamps["/p/1.jpg"], "20240101120000");
}

#[test]
fn test_cache_reflects_writes() {
    let (_dir, db) = test_db();
    db.store_photo(&sample_photo("/p/1.jpg", "20120105080000"), &[]).unwrap();
    db.rebuild_cache().unwrap();
    assert_eq!(db.years().unwrap(), vec!["2012"]);

    db.store_photo(&sample_photo("/p/2.jpg", "20130704101500"), &[]).unwrap();
    assert_eq!(db.years().unwrap(), vec!["2013", "2012"]);

    db.delete_photo("/p/1.jpg").unwrap();
    assert_eq!(db.years().unwrap(), vec!["2013"]);
}

#[test]
fn test_clones_share_cache() {
    let (_dir, db) = test_db();
    let reader = db.clone();
    assert!(reader.years().unwrap().is_empty());

    db.store_photo(&sample_photo("/p/1.jpg", "20120105080000"), &[]).unwrap();
    assert_eq!(reader.years().unwrap(), vec!["2012"]);
}

#[test]
fn test_concurrent_readers_see_whole_cache() {
    let (_dir, db) = test_db();
    for i in 0..20 {
        let datetime = format!("20{:02}0101000000", i);
        db.store_photo(&sample_photo(&format!("/p/{i}.jpg"), &datetime), &[])
            .unwrap();
    }
    let db = Arc::new(db);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for _ in 0..25 {
                    let years = db.years().unwrap();
                    assert!(years.len() == 20 || years.len() == 21, "{}", years.len());
                }
            })
        })
        .collect();

    let writer = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            for _ in 0..10 {
                db.rebuild_cache().unwrap();
            }
            db.store_photo(&sample_photo("/p/new.jpg", "19990101000000"), &[])
                .unwrap();
        })
    };

    for reader in readers {
        reader.join().unwrap();
    }
    writer.join().unwrap();
    assert_eq!(db.years().unwrap().len(), 21);
}

#[test]
fn test_single_writer_per_root() {
    let dir = tempfile::tempdir().unwrap();
    let first = Database::open(dir.path().join("data"), dir.path()).unwrap();
    let second = Database::open(dir.path().join("data"), dir.path()).unwrap();

    assert!(first.try_acquire_write_lock().unwrap());
    assert!(!second.try_acquire_write_lock().unwrap());
    assert!(!second.is_writable());

    let waiter = second.clone();
    let promoted = thread::spawn(move || {
        waiter.wait_for_write_lock().unwrap();
        waiter.is_writable()
    });

    thread::sleep(std::time::Duration::from_millis(100));
    assert!(!second.is_writable());

    first.release_write_lock().unwrap();
    assert!(!first.is_writable());
    assert!(promoted.join().unwrap());
    assert!(second.is_writable());

    second
        .store_photo(&sample_photo("/p/1.jpg", "20130704101500"), &[])
        .unwrap();
    assert_eq!(first.years().unwrap(), vec!["2013"]);
}
