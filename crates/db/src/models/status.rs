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
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Bulk job lifecycle status. Transitions are monotonic:
    /// created -> processing -> {completed | failed}.
    BulkJobStatus {
        Created = 1,
        Processing = 2,
        Completed = 3,
        Failed = 4,
    }
}

impl BulkJobStatus {
    /// Lowercase status name matching the `bulk_job_statuses` seed data.
    pub fn name(self) -> &'static str {
        match self {
            BulkJobStatus::Created => "created",
            BulkJobStatus::Processing => "processing",
            BulkJobStatus::Completed => "completed",
            BulkJobStatus::Failed => "failed",
        }
    }

    /// Resolve a status from its database ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(BulkJobStatus::Created),
            2 => Some(BulkJobStatus::Processing),
            3 => Some(BulkJobStatus::Completed),
            4 => Some(BulkJobStatus::Failed),
            _ => None,
        }
    }
}
