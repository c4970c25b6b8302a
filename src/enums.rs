//! Closed enumerations stored as canonical uppercase text columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Application role of a logged-in user.
    Role, "role" {
        Admin => "ADMIN",
        Technician => "TECNICO",
    }
}

text_enum! {
    MachineType, "machine type" {
        Pc => "PC",
        Laptop => "LAPTOP",
    }
}

text_enum! {
    /// Hardware tier of a machine.
    MachineProfile, "machine profile" {
        Regular => "REGULAR",
        Especial1 => "ESPECIAL 1",
        Especial2 => "ESPECIAL 2",
        Procesamiento => "PROCESAMIENTO",
    }
}

text_enum! {
    /// Whether a device is the one handed over (`NEW`) or retrieved (`OLD`).
    DeviceType, "device type" {
        New => "NEW",
        Old => "OLD",
    }
}

text_enum! {
    /// Confirmation state of a certificate. Only `Pending` may transition.
    CertificateStatus, "certificate status" {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Rejected => "REJECTED",
    }
}

impl CertificateStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            CertificateStatus::Pending => false,
            CertificateStatus::Confirmed | CertificateStatus::Rejected => true,
        }
    }
}
