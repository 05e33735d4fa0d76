use crate::{
    collaborators::Inventory,
    items::{
        GrantedItem,
        ItemDefinition,
        ItemOrigin,
        ItemQuality,
        LOCAL_ITEM_ID_START,
        Rarity,
    },
};
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashSet,
    fs::{
        self,
        OpenOptions,
    },
    io::{
        BufRead,
        BufReader,
        Write,
    },
    path::{
        Path,
        PathBuf,
    },
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

pub const COUNTER_FILE: &str = "next_item_id.json";
pub const DROPPED_ITEMS_FILE: &str = "dropped_items.jsonl";

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
struct CounterRecord {
    #[serde(rename = "LastUsedID")]
    last_used_id: u64,
}

/// One line of the dropped-items log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DroppedItemRecord {
    #[serde(rename = "ItemID")]
    pub item_id: u64,
    pub definition_index: u32,
    pub quality: ItemQuality,
    pub origin: ItemOrigin,
    pub rarity: Rarity,
    pub is_weapon: bool,
    pub allow_inspect: bool,
    pub is_strange: bool,
    pub is_unusual: bool,
    #[serde(default)]
    pub dropped_at: Option<String>,
}

impl DroppedItemRecord {
    pub fn new(item: &GrantedItem, definition: &ItemDefinition) -> Self {
        Self {
            item_id: item.item_id,
            definition_index: item.definition_index,
            quality: item.quality,
            origin: item.origin,
            rarity: item.rarity,
            is_weapon: definition.is_weapon(),
            allow_inspect: definition.allows_inspect(),
            is_strange: item.is_strange,
            is_unusual: item.is_unusual,
            dropped_at: Some(Utc::now().to_rfc3339()),
        }
    }

    pub fn item(&self) -> GrantedItem {
        GrantedItem {
            item_id: self.item_id,
            definition_index: self.definition_index,
            quality: self.quality,
            rarity: self.rarity,
            origin: self.origin,
            is_strange: self.is_strange,
            is_unusual: self.is_unusual,
        }
    }
}

/// Durable record of locally granted items plus the counter that numbers
/// them. Every I/O failure is logged and swallowed: the worst case is an
/// item that is not remembered across a restart.
#[derive(Debug)]
pub struct RewardLedger {
    dir: PathBuf,
    last_used_id: u64,
}

impl RewardLedger {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let mut ledger = Self {
            dir: dir.into(),
            last_used_id: 0,
        };
        let counter_path = ledger.counter_path();
        ledger.last_used_id = match read_counter(&counter_path) {
            Ok(Some(record)) => record.last_used_id,
            Ok(None) => {
                info!(path = %counter_path.display(), "no item id counter found, starting fresh");
                0
            }
            Err(err) => {
                warn!(?err, "item id counter unreadable, starting fresh");
                0
            }
        };
        // A lost counter must not hand out ids already present in the log.
        let highest_logged = ledger
            .load_all()
            .iter()
            .filter(|item| item.is_local())
            .map(|item| item.item_id - LOCAL_ITEM_ID_START)
            .max()
            .unwrap_or(0);
        if highest_logged > ledger.last_used_id {
            warn!(
                counter = ledger.last_used_id,
                highest_logged, "item id counter behind dropped-items log, catching up"
            );
            ledger.last_used_id = highest_logged;
        }
        ledger
    }

    pub fn counter_path(&self) -> PathBuf {
        self.dir.join(COUNTER_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(DROPPED_ITEMS_FILE)
    }

    pub fn peek_next_item_id(&self) -> u64 {
        LOCAL_ITEM_ID_START + self.last_used_id + 1
    }

    /// Hand out the next local item id, persisting the counter before the id
    /// is returned.
    pub fn next_item_id(&mut self) -> u64 {
        self.last_used_id += 1;
        let record = CounterRecord {
            last_used_id: self.last_used_id,
        };
        if let Err(err) = write_counter(&self.dir, &record) {
            error!(?err, last_used_id = self.last_used_id, "failed to persist item id counter");
        }
        LOCAL_ITEM_ID_START + self.last_used_id
    }

    pub fn record(&self, item: &GrantedItem, definition: &ItemDefinition) {
        let record = DroppedItemRecord::new(item, definition);
        match append_record(&self.dir, &record) {
            Ok(()) => debug!(item_id = item.item_id, "recorded dropped item"),
            Err(err) => error!(?err, item_id = item.item_id, "failed to record dropped item"),
        }
    }

    pub fn load_records(&self) -> Result<Vec<DroppedItemRecord>> {
        read_records(&self.log_path())
    }

    /// Replay the dropped-items log, one entry per item id.
    pub fn load_all(&self) -> Vec<GrantedItem> {
        let records = match self.load_records() {
            Ok(records) => records,
            Err(err) => {
                warn!(?err, "dropped-items log unreadable, treating as empty");
                return Vec::new();
            }
        };
        let mut seen = HashSet::new();
        records
            .iter()
            .map(DroppedItemRecord::item)
            .filter(|item| {
                let fresh = seen.insert(item.item_id);
                if !fresh {
                    debug!(item_id = item.item_id, "duplicate entry in dropped-items log");
                }
                fresh
            })
            .collect()
    }

    /// Re-insert remembered items the inventory does not already hold.
    /// Returns how many were inserted.
    pub fn restore_into<I: Inventory>(&self, inventory: &mut I) -> usize {
        let mut restored = 0;
        for item in self.load_all() {
            if inventory.contains(item.item_id) {
                debug!(item_id = item.item_id, "dropped item already in inventory, skipping");
                continue;
            }
            match inventory.add_item(item) {
                Ok(()) => restored += 1,
                Err(err) => warn!(?err, item_id = item.item_id, "failed to restore dropped item"),
            }
        }
        if restored > 0 {
            info!(restored, "restored dropped items into inventory");
        }
        restored
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("Failed to create ledger directory {}", dir.display()))?;
    }
    Ok(())
}

fn read_counter(path: &Path) -> Result<Option<CounterRecord>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(path).wrap_err("Failed to read item id counter")?;
    if data.is_empty() {
        return Ok(None);
    }
    let record = serde_json::from_slice::<CounterRecord>(&data)
        .wrap_err("Failed to parse item id counter JSON")?;
    Ok(Some(record))
}

fn write_counter(dir: &Path, record: &CounterRecord) -> Result<()> {
    ensure_dir(dir)?;
    let json = serde_json::to_vec_pretty(record).wrap_err("Failed to serialize item id counter")?;
    // write-then-rename so a crash never leaves a truncated counter behind
    let tmp = dir.join(format!("{COUNTER_FILE}.tmp"));
    let mut file = fs::File::create(&tmp).wrap_err("Failed to create item id counter temp file")?;
    file.write_all(&json)
        .wrap_err("Failed to write item id counter")?;
    file.sync_all().wrap_err("Failed to sync item id counter")?;
    fs::rename(&tmp, dir.join(COUNTER_FILE)).wrap_err("Failed to replace item id counter")?;
    Ok(())
}

fn append_record(dir: &Path, record: &DroppedItemRecord) -> Result<()> {
    ensure_dir(dir)?;
    let line = serde_json::to_string(record).wrap_err("Failed to serialize dropped item")?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(DROPPED_ITEMS_FILE))
        .wrap_err("Failed to open dropped-items log")?;
    file.write_all(line.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .wrap_err("Failed to append dropped item")?;
    Ok(())
}

fn read_records(path: &Path) -> Result<Vec<DroppedItemRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(path).wrap_err("Failed to open dropped-items log")?;
    let mut records = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.wrap_err("Failed to read dropped-items log")?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DroppedItemRecord>(&line) {
            Ok(record) => records.push(record),
            Err(err) => warn!(?err, line = line_no + 1, "skipping malformed dropped-items entry"),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use tempdir::TempDir;

    #[test]
    fn read_records__skips_malformed_lines() {
        // given
        let dir = TempDir::new("ledger").unwrap();
        let path = dir.path().join(DROPPED_ITEMS_FILE);
        let good = r#"{"ItemID":2146435073,"DefinitionIndex":15000,"Quality":"Unique","Origin":"FoundInCrate","Rarity":"Mercenary","IsWeapon":true,"AllowInspect":true,"IsStrange":false,"IsUnusual":false}"#;
        fs::write(&path, format!("{good}\nnot json\n\n{good}\n")).unwrap();

        // when
        let records = read_records(&path).unwrap();

        // then
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item_id, 2_146_435_073);
        assert_eq!(records[0].dropped_at, None);
    }

    #[test]
    fn open__treats_corrupt_counter_as_fresh() {
        let dir = TempDir::new("ledger").unwrap();
        fs::write(dir.path().join(COUNTER_FILE), b"{ nope").unwrap();

        let ledger = RewardLedger::open(dir.path());

        assert_eq!(ledger.peek_next_item_id(), LOCAL_ITEM_ID_START + 1);
    }

    #[test]
    fn counter_record__uses_last_used_id_key() {
        let json = serde_json::to_string(&CounterRecord { last_used_id: 7 }).unwrap();
        assert_eq!(json, r#"{"LastUsedID":7}"#);
    }
}
