/// Index schema. Every queryable column of `files` carries its own index;
/// `files_tags` duplicates the owning photo's datetime so tag listings can be
/// ordered without a join.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    path            TEXT NOT NULL UNIQUE,
    datetime        TEXT NOT NULL,
    last_modified   TEXT NOT NULL,
    year            TEXT NOT NULL,
    month           TEXT NOT NULL,
    day             TEXT NOT NULL,
    f               TEXT,
    iso             TEXT,
    make            TEXT,
    camera          TEXT,
    focal_length    TEXT,
    lens_model      TEXT,
    lens_spec       TEXT,
    label           TEXT
);
CREATE INDEX IF NOT EXISTS idx_files_datetime ON files(datetime);
CREATE INDEX IF NOT EXISTS idx_files_last_modified ON files(last_modified);
CREATE INDEX IF NOT EXISTS idx_files_year ON files(year);
CREATE INDEX IF NOT EXISTS idx_files_month ON files(month);
CREATE INDEX IF NOT EXISTS idx_files_day ON files(day);
CREATE INDEX IF NOT EXISTS idx_files_f ON files(f);
CREATE INDEX IF NOT EXISTS idx_files_iso ON files(iso);
CREATE INDEX IF NOT EXISTS idx_files_make ON files(make);
CREATE INDEX IF NOT EXISTS idx_files_camera ON files(camera);
CREATE INDEX IF NOT EXISTS idx_files_focal_length ON files(focal_length);
CREATE INDEX IF NOT EXISTS idx_files_lens_model ON files(lens_model);
CREATE INDEX IF NOT EXISTS idx_files_lens_spec ON files(lens_spec);
CREATE INDEX IF NOT EXISTS idx_files_label ON files(label);

CREATE TABLE IF NOT EXISTS files_tags (
    path            TEXT NOT NULL,
    tag             TEXT NOT NULL,
    files_rowid     INTEGER NOT NULL,
    datetime        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_files_tags_path ON files_tags(path);
CREATE INDEX IF NOT EXISTS idx_files_tags_tag ON files_tags(tag);
CREATE INDEX IF NOT EXISTS idx_files_tags_rowid ON files_tags(files_rowid);
"#;
