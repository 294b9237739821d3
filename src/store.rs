//! Deduplicated persistent storage with keyset pagination and FTS (spec §4.4).
//!
//! Backing schema translated from `original_source/feedor.py`'s literal
//! `entries`/`etags`/`search` DDL, `fts4` upgraded to `fts5`. Methods call
//! rusqlite directly from async callers without `spawn_blocking`, the same
//! choice the teacher's own `bitvia-news.rs` poll loop makes for its
//! rusqlite calls inside `#[tokio::main]`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Entry, EtagRecord, PageCursor, StoredEntry};

const SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/db/schema.sql"));

pub struct Store {
    write_conn: Mutex<Connection>,
    path: PathBuf,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .map_err(|e| anyhow::anyhow!("open sqlite at {}: {e}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store {
            write_conn: Mutex::new(conn),
            path,
        })
    }

    fn read_conn(&self) -> anyhow::Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    /// Mtime of the backing db file, epoch seconds. Seeds `AppState`'s
    /// `last_updated_at` at startup so `/feed.html`'s "Updated" line reflects
    /// the store's actual last write before the first poll round completes,
    /// the same `getmtime("feeds.db")` read `original_source/feedor.py` does
    /// at startup (spec §3).
    pub fn mtime(&self) -> anyhow::Result<i64> {
        let modified = std::fs::metadata(&self.path)
            .with_context(|| format!("reading metadata for {}", self.path.display()))?
            .modified()
            .with_context(|| format!("reading mtime for {}", self.path.display()))?;
        let secs = modified
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("db mtime before epoch: {e}"))?
            .as_secs();
        Ok(secs as i64)
    }

    /// Atomic replace-on-`guid`: writes the JSON blob + `time`, then the
    /// parallel search row keyed by the new rowid, in one transaction.
    /// Per spec §9's resolved Open Question, one transaction covers every
    /// entry from a single source, not one transaction per entry.
    pub fn put_entries(&self, entries: &[Entry]) -> anyhow::Result<()> {
        let mut conn = self
            .write_conn
            .lock()
            .map_err(|_| anyhow::anyhow!("store write lock poisoned"))?;
        let tx = conn.transaction()?;
        for entry in entries {
            let data = serde_json::to_string(entry)?;
            tx.execute(
                "INSERT INTO entries(data, time) VALUES (?1, ?2)
                 ON CONFLICT(guid) DO UPDATE SET data = excluded.data, time = excluded.time",
                params![data, entry.published_time],
            )?;
            let rowid: i64 = tx.query_row(
                "SELECT rowid FROM entries WHERE guid = ?1",
                params![entry.id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO search(rowid, title, description, source) VALUES (?1, ?2, ?3, ?4)",
                params![
                    rowid,
                    entry.title.clone().unwrap_or_default(),
                    entry.description.clone().unwrap_or_default(),
                    entry.source
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_etag(&self, feed_url: &str) -> anyhow::Result<Option<EtagRecord>> {
        let conn = self
            .write_conn
            .lock()
            .map_err(|_| anyhow::anyhow!("store write lock poisoned"))?;
        let record = conn
            .query_row(
                "SELECT feed, etag, time FROM etags WHERE feed = ?1",
                params![feed_url],
                |row| {
                    Ok(EtagRecord {
                        feed_url: row.get(0)?,
                        etag: row.get(1)?,
                        last_seen_time: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Mutated only by the ConditionalFetcher on a successful response.
    pub fn put_etag(&self, feed_url: &str, etag: &str, now: i64) -> anyhow::Result<()> {
        let conn = self
            .write_conn
            .lock()
            .map_err(|_| anyhow::anyhow!("store write lock poisoned"))?;
        conn.execute(
            "INSERT INTO etags(feed, etag, time) VALUES (?1, ?2, ?3)
             ON CONFLICT(feed) DO UPDATE SET etag = excluded.etag, time = excluded.time",
            params![feed_url, etag, now],
        )?;
        Ok(())
    }

    /// `list(limit, cursor?)`, ordered `(time DESC, rowid DESC)` per spec §4.4.
    pub fn list(
        &self,
        limit: u32,
        cursor: Option<PageCursor>,
    ) -> anyhow::Result<(Vec<StoredEntry>, Option<PageCursor>)> {
        let conn = self.read_conn()?;
        let mut rows = match cursor {
            None => {
                let mut stmt = conn.prepare(
                    "SELECT data, time, rowid FROM entries ORDER BY time DESC, rowid DESC LIMIT ?1",
                )?;
                collect_rows(stmt.query(params![limit])?)?
            }
            Some(c) => {
                let mut stmt = conn.prepare(
                    "SELECT data, time, rowid FROM entries
                     WHERE time < ?1 OR (time = ?1 AND rowid < ?2)
                     ORDER BY time DESC, rowid DESC LIMIT ?3",
                )?;
                collect_rows(stmt.query(params![c.time, c.rowid, limit])?)?
            }
        };
        let next_cursor = rows.last().map(|e: &StoredEntry| PageCursor {
            time: e.entry.published_time,
            rowid: e.rowid,
        });
        rows.shrink_to_fit();
        Ok((rows, next_cursor))
    }

    /// `search(query, limit)`, query string passed verbatim to FTS5.
    pub fn search(&self, query: &str, limit: u32) -> anyhow::Result<Vec<StoredEntry>> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT entries.data, entries.time, entries.rowid FROM entries
             JOIN search ON entries.rowid = search.rowid
             WHERE search MATCH ?1
             ORDER BY entries.time DESC, entries.rowid DESC
             LIMIT ?2",
        )?;
        collect_rows(stmt.query(params![query, limit])?)
    }

    /// `href` of every entry link with `rel="enclosure"` and an image MIME type.
    pub fn list_image_enclosures(&self) -> anyhow::Result<Vec<String>> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT json_each.value ->> 'href'
             FROM entries, json_each(entries.data -> 'links')
             WHERE json_each.value ->> 'rel' = 'enclosure'
               AND json_each.value ->> 'type' LIKE 'image/%'",
        )?;
        let hrefs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hrefs)
    }
}

fn collect_rows(mut rows: rusqlite::Rows<'_>) -> anyhow::Result<Vec<StoredEntry>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let data: String = row.get(0)?;
        let rowid: i64 = row.get(2)?;
        let entry: Entry = serde_json::from_str(&data)?;
        out.push(StoredEntry { entry, rowid });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryLink;

    fn sample_entry(id: &str, time: i64, title: &str) -> Entry {
        Entry {
            id: id.to_string(),
            source: "https://h/feed".to_string(),
            source_title: Some("Feed".to_string()),
            title: Some(title.to_string()),
            description: Some(format!("<p>{title}</p>")),
            link: Some(format!("https://h/{id}")),
            published_time: time,
            links: vec![EntryLink {
                href: "https://h/img.png".to_string(),
                link_type: Some("image/png".to_string()),
                length: 0,
                rel: Some("enclosure".to_string()),
            }],
            extra: Default::default(),
        }
    }

    fn open_temp() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("feeds.db")).unwrap();
        (store, dir)
    }

    #[test]
    fn put_and_list_orders_by_time_then_rowid_desc() {
        let (store, _dir) = open_temp();
        store
            .put_entries(&[sample_entry("1", 100, "A"), sample_entry("2", 200, "B")])
            .unwrap();
        let (rows, cursor) = store.list(10, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entry.id, "2");
        assert_eq!(rows[1].entry.id, "1");
        assert_eq!(cursor.unwrap().time, 100);
    }

    #[test]
    fn repeated_upsert_of_same_id_replaces_payload() {
        let (store, _dir) = open_temp();
        store.put_entries(&[sample_entry("1", 100, "A")]).unwrap();
        store.put_entries(&[sample_entry("1", 300, "A updated")]).unwrap();
        let (rows, _) = store.list(10, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry.title.as_deref(), Some("A updated"));
        assert_eq!(rows[0].entry.published_time, 300);
    }

    #[test]
    fn keyset_pagination_is_stable_across_pages() {
        let (store, _dir) = open_temp();
        let entries: Vec<Entry> = (0..5)
            .map(|i| sample_entry(&i.to_string(), i * 100, &format!("item{i}")))
            .collect();
        store.put_entries(&entries).unwrap();

        let (first_page, cursor1) = store.list(2, None).unwrap();
        assert_eq!(first_page.len(), 2);
        let (second_page, _) = store.list(2, cursor1).unwrap();
        assert_eq!(second_page.len(), 2);

        let last_of_first = (
            first_page.last().unwrap().entry.published_time,
            first_page.last().unwrap().rowid,
        );
        let first_of_second = (
            second_page[0].entry.published_time,
            second_page[0].rowid,
        );
        assert!(first_of_second < last_of_first);
    }

    #[test]
    fn search_finds_matching_entry_and_not_unrelated_one() {
        let (store, _dir) = open_temp();
        store
            .put_entries(&[sample_entry("1", 100, "hello there")])
            .unwrap();
        store.put_entries(&[sample_entry("2", 200, "world")]).unwrap();

        let hits = store.search("hello", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, "1");
        assert!(hits.iter().all(|e| e.entry.id != "2"));

        let world_hits = store.search("world", 10).unwrap();
        assert_eq!(world_hits.len(), 1);
        assert_eq!(world_hits[0].entry.id, "2");
        assert!(world_hits.iter().all(|e| e.entry.id != "1"));
    }

    #[test]
    fn list_image_enclosures_filters_by_rel_and_type() {
        let (store, _dir) = open_temp();
        store.put_entries(&[sample_entry("1", 100, "A")]).unwrap();
        let images = store.list_image_enclosures().unwrap();
        assert_eq!(images, vec!["https://h/img.png".to_string()]);
    }

    #[test]
    fn etag_record_round_trips() {
        let (store, _dir) = open_temp();
        assert!(store.get_etag("https://h/feed").unwrap().is_none());
        store.put_etag("https://h/feed", "\"abc\"", 42).unwrap();
        let record = store.get_etag("https://h/feed").unwrap().unwrap();
        assert_eq!(record.etag.as_deref(), Some("\"abc\""));
        assert_eq!(record.last_seen_time, 42);
    }
}
