//! Property-list decoding of the RAID listing.
//!
//! The document is walked as an untyped [`plist::Value`] tree instead of
//! being deserialized into structs, so that one malformed field only costs
//! that field. The only hard failures are a non-plist buffer and a missing
//! or mistyped [`RAID_SETS_KEY`].

use std::io::Cursor;

use mqttbot_types::{Member, RaidDocument, RaidSet};
use plist::{Dictionary, Value};

use super::RawOutput;
use crate::DecodeError;

/// Top-level key holding the array records.
pub const RAID_SETS_KEY: &str = "AppleRAIDSets";

const SET_UUID: &str = "AppleRAIDSetUUID";
const MEMBER_UUID: &str = "AppleRAIDMemberUUID";
const BSD_NAME: &str = "BSD Name";
const NAME: &str = "Name";
const LEVEL: &str = "Level";
const STATUS: &str = "Status";
const MEMBER_STATUS: &str = "MemberStatus";
const MEMBERS: &str = "Members";
const SPARES: &str = "Spares";

/// Decode a captured listing. Binary and XML encodings are both accepted.
pub fn decode(raw: &RawOutput) -> Result<RaidDocument, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::Plist("empty output".to_string()));
    }
    let value = Value::from_reader(Cursor::new(raw.as_bytes()))?;

    let root = value
        .as_dictionary()
        .ok_or(DecodeError::RootNotDictionary)?;

    let sets = root
        .get(RAID_SETS_KEY)
        .ok_or(DecodeError::MissingContainer(RAID_SETS_KEY))?
        .as_array()
        .ok_or(DecodeError::ContainerNotArray(RAID_SETS_KEY))?;

    Ok(RaidDocument {
        sets: sets.iter().map(decode_set).collect(),
    })
}

// A non-dictionary element still counts as an (empty) array so the
// number of decoded sets matches the listing.
fn decode_set(value: &Value) -> RaidSet {
    let Some(dict) = value.as_dictionary() else {
        return RaidSet::default();
    };

    RaidSet {
        uuid: string(dict, SET_UUID),
        name: string(dict, NAME),
        bsd_name: string(dict, BSD_NAME),
        level: string(dict, LEVEL),
        status: string(dict, STATUS),
        members: records(dict, MEMBERS),
        spares: records(dict, SPARES),
    }
}

fn decode_member(value: &Value) -> Member {
    let Some(dict) = value.as_dictionary() else {
        return Member::default();
    };

    Member {
        uuid: string(dict, MEMBER_UUID),
        bsd_name: string(dict, BSD_NAME),
        status: string(dict, MEMBER_STATUS),
    }
}

fn records(dict: &Dictionary, key: &str) -> Vec<Member> {
    dict.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(decode_member).collect())
        .unwrap_or_default()
}

fn string(dict: &Dictionary, key: &str) -> String {
    dict.get(key)
        .and_then(Value::as_string)
        .unwrap_or_default()
        .to_string()
}
