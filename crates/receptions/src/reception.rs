use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pvz_core::{DomainError, DomainResult, PvzId, ReceptionId};

use crate::product::{Product, ProductType};

/// Reception status.
///
/// `InProgress -> Closed` is the only transition; `Closed` is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceptionStatus {
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "closed", alias = "close")]
    Closed,
}

impl ReceptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceptionStatus::InProgress => "in_progress",
            ReceptionStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(ReceptionStatus::InProgress),
            "closed" | "close" => Some(ReceptionStatus::Closed),
            _ => None,
        }
    }
}

impl core::fmt::Display for ReceptionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One intake session at a PVZ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reception {
    pub id: ReceptionId,
    pub pvz_id: PvzId,
    pub opened_at: DateTime<Utc>,
    pub status: ReceptionStatus,
    /// Set exactly once, by the close transition.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Reception {
    /// A freshly opened reception.
    pub fn open(pvz_id: PvzId, opened_at: DateTime<Utc>) -> Self {
        Self {
            id: ReceptionId::new(),
            pvz_id,
            opened_at,
            status: ReceptionStatus::InProgress,
            closed_at: None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == ReceptionStatus::InProgress
    }

    /// Products may only be attached, retracted or the reception closed
    /// while it is in progress.
    pub fn ensure_in_progress(&self) -> DomainResult<()> {
        if self.is_in_progress() {
            Ok(())
        } else {
            Err(DomainError::NoReceptionInProgress {
                pvz_id: self.pvz_id,
            })
        }
    }

    /// Register a product scanned at `added_at`.
    pub fn register_product(
        &self,
        product_type: ProductType,
        added_at: DateTime<Utc>,
    ) -> DomainResult<Product> {
        self.ensure_in_progress()?;
        Ok(Product::new(self.id, product_type, added_at))
    }

    /// The closed version of this reception.
    ///
    /// A closed reception cannot be closed again: a second close reports
    /// `NoReceptionInProgress`, never a silent success.
    pub fn close(&self, closed_at: DateTime<Utc>) -> DomainResult<Reception> {
        self.ensure_in_progress()?;
        Ok(Reception {
            status: ReceptionStatus::Closed,
            closed_at: Some(closed_at),
            ..self.clone()
        })
    }
}

/// Opening is refused while the PVZ already has a reception in progress.
pub fn ensure_can_open(pvz_id: PvzId, current: Option<&Reception>) -> DomainResult<()> {
    match current {
        Some(r) if r.is_in_progress() => Err(DomainError::ReceptionAlreadyOpen { pvz_id }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn open_reception() -> Reception {
        Reception::open(PvzId::new(), Utc::now())
    }

    #[test]
    fn open_starts_in_progress_without_close_time() {
        let r = open_reception();
        assert_eq!(r.status, ReceptionStatus::InProgress);
        assert!(r.closed_at.is_none());
    }

    #[test]
    fn close_is_terminal() {
        let r = open_reception();
        let at = r.opened_at + Duration::minutes(5);
        let closed = r.close(at).unwrap();

        assert_eq!(closed.status, ReceptionStatus::Closed);
        assert_eq!(closed.closed_at, Some(at));
        assert_eq!(closed.id, r.id);
        assert_eq!(closed.opened_at, r.opened_at);

        let err = closed.close(at + Duration::minutes(1)).unwrap_err();
        assert_eq!(
            err,
            DomainError::NoReceptionInProgress {
                pvz_id: r.pvz_id
            }
        );
    }

    #[test]
    fn closed_reception_rejects_products() {
        let closed = open_reception().close(Utc::now()).unwrap();
        let err = closed
            .register_product(ProductType::Shoes, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::NoReceptionInProgress { .. }));
    }

    #[test]
    fn registered_product_belongs_to_reception() {
        let r = open_reception();
        let p = r.register_product(ProductType::Clothing, Utc::now()).unwrap();
        assert_eq!(p.reception_id, r.id);
        assert_eq!(p.product_type, ProductType::Clothing);
    }

    #[test]
    fn cannot_open_while_another_is_in_progress() {
        let current = open_reception();
        let pvz_id = current.pvz_id;

        assert_eq!(
            ensure_can_open(pvz_id, Some(&current)),
            Err(DomainError::ReceptionAlreadyOpen { pvz_id })
        );
        assert!(ensure_can_open(pvz_id, None).is_ok());

        let closed = current.close(Utc::now()).unwrap();
        assert!(ensure_can_open(pvz_id, Some(&closed)).is_ok());
    }

    #[test]
    fn status_accepts_legacy_close_spelling() {
        let s: ReceptionStatus = serde_json::from_str("\"close\"").unwrap();
        assert_eq!(s, ReceptionStatus::Closed);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"closed\"");
        assert_eq!(ReceptionStatus::parse("in_progress"), Some(ReceptionStatus::InProgress));
        assert_eq!(ReceptionStatus::parse("open"), None);
    }

    proptest! {
        // `true` tries to open, `false` tries to close the current reception.
        #[test]
        fn at_most_one_reception_in_progress(steps in prop::collection::vec(any::<bool>(), 0..60)) {
            let pvz_id = PvzId::new();
            let mut history: Vec<Reception> = Vec::new();

            for open in steps {
                let current = history.iter().position(Reception::is_in_progress);
                if open {
                    let allowed = ensure_can_open(pvz_id, current.map(|i| &history[i])).is_ok();
                    prop_assert_eq!(allowed, current.is_none());
                    if allowed {
                        history.push(Reception::open(pvz_id, Utc::now()));
                    }
                } else if let Some(i) = current {
                    history[i] = history[i].close(Utc::now()).unwrap();
                }

                let in_progress = history.iter().filter(|r| r.is_in_progress()).count();
                prop_assert!(in_progress <= 1);
            }
        }
    }
}
