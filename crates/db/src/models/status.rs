//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database status ID back to the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                $(
                    if id == $val {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Crew execution lifecycle status.
    ExecutionStatus {
        Pending = 1,
        Running = 2,
        AwaitingApproval = 3,
        Completed = 4,
        Failed = 5,
        Cancelled = 6,
    }
}

define_status_enum! {
    /// HITL checkpoint review status.
    CheckpointStatus {
        Pending = 1,
        Approved = 2,
        Rejected = 3,
    }
}

impl ExecutionStatus {
    /// Terminal executions accept no further mutation.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Status name as seeded in `execution_statuses`.
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::AwaitingApproval => "awaiting_approval",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

impl CheckpointStatus {
    /// Status name as seeded in `checkpoint_statuses`.
    pub fn as_str(self) -> &'static str {
        match self {
            CheckpointStatus::Pending => "pending",
            CheckpointStatus::Approved => "approved",
            CheckpointStatus::Rejected => "rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_status_ids_match_seed_data() {
        assert_eq!(ExecutionStatus::Pending.id(), 1);
        assert_eq!(ExecutionStatus::Running.id(), 2);
        assert_eq!(ExecutionStatus::AwaitingApproval.id(), 3);
        assert_eq!(ExecutionStatus::Completed.id(), 4);
        assert_eq!(ExecutionStatus::Failed.id(), 5);
        assert_eq!(ExecutionStatus::Cancelled.id(), 6);
    }

    #[test]
    fn checkpoint_status_ids_match_seed_data() {
        assert_eq!(CheckpointStatus::Pending.id(), 1);
        assert_eq!(CheckpointStatus::Approved.id(), 2);
        assert_eq!(CheckpointStatus::Rejected.id(), 3);
    }

    #[test]
    fn from_id_round_trips() {
        for id in 1..=6 {
            let status = ExecutionStatus::from_id(id).expect("seeded id");
            assert_eq!(status.id(), id);
        }
        assert_eq!(ExecutionStatus::from_id(0), None);
        assert_eq!(ExecutionStatus::from_id(7), None);
    }

    #[test]
    fn only_completed_failed_cancelled_are_terminal() {
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::AwaitingApproval.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
    }
}
