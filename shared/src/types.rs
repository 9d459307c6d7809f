//! Common types used across the platform

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to the piece of land a plan or harvest belongs to.
///
/// Properties are divided into sectors, sectors into lots and lots into
/// beds. A plan always points at exactly one of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AreaRef {
    Sector(Uuid),
    Lot(Uuid),
    Bed(Uuid),
}

impl AreaRef {
    /// Build an area reference from three nullable columns.
    /// Returns None unless exactly one of them is set.
    pub fn from_columns(
        sector_id: Option<Uuid>,
        lot_id: Option<Uuid>,
        bed_id: Option<Uuid>,
    ) -> Option<Self> {
        match (sector_id, lot_id, bed_id) {
            (Some(id), None, None) => Some(AreaRef::Sector(id)),
            (None, Some(id), None) => Some(AreaRef::Lot(id)),
            (None, None, Some(id)) => Some(AreaRef::Bed(id)),
            _ => None,
        }
    }

    /// Split back into `(sector_id, lot_id, bed_id)` columns
    pub fn to_columns(self) -> (Option<Uuid>, Option<Uuid>, Option<Uuid>) {
        match self {
            AreaRef::Sector(id) => (Some(id), None, None),
            AreaRef::Lot(id) => (None, Some(id), None),
            AreaRef::Bed(id) => (None, None, Some(id)),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            AreaRef::Sector(id) | AreaRef::Lot(id) | AreaRef::Bed(id) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_from_exactly_one_column() {
        let id = Uuid::new_v4();
        assert_eq!(AreaRef::from_columns(None, Some(id), None), Some(AreaRef::Lot(id)));
        assert_eq!(AreaRef::from_columns(None, None, None), None);
        assert_eq!(AreaRef::from_columns(Some(id), Some(id), None), None);
    }

    #[test]
    fn test_area_columns_round_trip() {
        let area = AreaRef::Bed(Uuid::new_v4());
        let (s, l, b) = area.to_columns();
        assert_eq!(AreaRef::from_columns(s, l, b), Some(area));
    }

    #[test]
    fn test_area_serializes_tagged() {
        let id = Uuid::nil();
        let json = serde_json::to_value(AreaRef::Sector(id)).unwrap();
        assert_eq!(json["kind"], "sector");
        assert_eq!(json["id"], id.to_string());
    }
}
