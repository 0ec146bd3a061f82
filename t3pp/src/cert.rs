// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! This module implements the publisher certificate.
//!
//! A publisher certificate is a self-contained JSON document naming the source and distributor of a
//! patch, an optional validity window, and the publisher's public key. Certificates are not chained to
//! any root: a certificate is only ever trusted because the fingerprint of its public key is known to
//! a [crate::trust::TrustProvider].

use crate::keys::EcdsaPublicKey;
use crate::package::error::{Error, PatchErrorKind};
use crate::package::{open_existing, Result, PUBLISHER_CERTIFICATE_FORMAT};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

/// The usage tag given to new certificates. It is informational only.
pub const DEFAULT_USAGE: &str = "PatchSigning";

/// Outcome of checking a certificate's validity window against a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateValidity {
    /// The window could not be evaluated, for example because it is inverted.
    Unknown,
    Valid,
    NotYetValid,
    Expired,
}

/// Version 1 of the publisher certificate document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherCertificate {
    /// Always [PUBLISHER_CERTIFICATE_FORMAT].
    pub format: String,

    /// Always 1.
    pub version: u32,

    pub source: String,

    pub distributor: String,

    /// Operator-chosen serial number. No uniqueness scheme is enforced.
    #[serde(rename = "serial")]
    pub serial_number: String,

    /// Start of the validity window. Absent means no lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before_utc: Option<DateTime<Utc>>,

    /// End of the validity window. Absent means no upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after_utc: Option<DateTime<Utc>>,

    #[serde(default = "default_usage")]
    pub usage: String,

    pub public_key: EcdsaPublicKey,
}

fn default_usage() -> String {
    DEFAULT_USAGE.to_string()
}

impl PublisherCertificate {
    /// Creates an unconstrained certificate for the given public key.
    ///
    /// If `serial_number` is blank, a fresh one is generated with [generate_serial].
    pub fn new(
        source: &str,
        distributor: &str,
        serial_number: &str,
        public_key: EcdsaPublicKey,
    ) -> PublisherCertificate {
        let serial_number = if serial_number.trim().is_empty() {
            generate_serial()
        } else {
            serial_number.trim().to_string()
        };

        PublisherCertificate {
            format: PUBLISHER_CERTIFICATE_FORMAT.to_string(),
            version: 1,
            source: source.trim().to_string(),
            distributor: distributor.trim().to_string(),
            serial_number,
            not_before_utc: None,
            not_after_utc: None,
            usage: default_usage(),
            public_key,
        }
    }

    pub fn valid_from(mut self, not_before: DateTime<Utc>) -> PublisherCertificate {
        self.not_before_utc = Some(not_before);
        self
    }

    pub fn valid_until(mut self, not_after: DateTime<Utc>) -> PublisherCertificate {
        self.not_after_utc = Some(not_after);
        self
    }

    pub fn with_usage(mut self, usage: &str) -> PublisherCertificate {
        self.usage = usage.to_string();
        self
    }

    /// Sets the start of the window to the beginning of `first_day` in UTC.
    pub fn valid_from_date(self, first_day: NaiveDate) -> PublisherCertificate {
        self.valid_from(start_of_day(first_day))
    }

    /// Sets the window to cover whole calendar days, from the start of `first_day` to the last second of
    /// `last_day`, both in UTC.
    pub fn with_validity_dates(self, first_day: NaiveDate, last_day: NaiveDate) -> PublisherCertificate {
        self.valid_from_date(first_day)
            .valid_until(end_of_day(last_day))
    }

    /// Sets a window of `days` whole days beginning on `first_day`.
    ///
    /// A value of zero or one produces a window covering `first_day` only.
    pub fn valid_for_days(self, first_day: NaiveDate, days: u32) -> PublisherCertificate {
        let last_day = first_day + Duration::days(i64::from(days.max(1)) - 1);
        self.with_validity_dates(first_day, last_day)
    }

    /// Evaluates the validity window at the given instant. Both bounds are inclusive.
    pub fn validity_at(&self, now: DateTime<Utc>) -> CertificateValidity {
        if let (Some(not_before), Some(not_after)) = (self.not_before_utc, self.not_after_utc) {
            if not_before > not_after {
                return CertificateValidity::Unknown;
            }
        }

        match (self.not_before_utc, self.not_after_utc) {
            (Some(not_before), _) if now < not_before => CertificateValidity::NotYetValid,
            (_, Some(not_after)) if now > not_after => CertificateValidity::Expired,
            _ => CertificateValidity::Valid,
        }
    }

    /// The fingerprint of the embedded public key.
    pub fn fingerprint(&self) -> Result<String> {
        Ok(self.public_key.fingerprint()?)
    }

    /// Checks the format tag and version.
    pub fn check_format(&self) -> Result<()> {
        if self.format.eq_ignore_ascii_case(PUBLISHER_CERTIFICATE_FORMAT) && self.version == 1 {
            Ok(())
        } else {
            Err(Error::PatchError(PatchErrorKind::InvalidFormat))
        }
    }
}

/// Generates a 16-digit uppercase hexadecimal serial number from a random UUID.
pub fn generate_serial() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..16].to_ascii_uppercase()
}

/// Loads a certificate document, failing with [PatchErrorKind::InvalidFormat] if the format tag or
/// version does not match.
pub fn load_certificate(path: &Path) -> Result<PublisherCertificate> {
    let file = open_existing(path)?;
    let certificate: PublisherCertificate = serde_json::from_reader(BufReader::new(file))?;
    certificate.check_format()?;
    Ok(certificate)
}

/// Saves a certificate document as indented JSON.
pub fn save_certificate(path: &Path, certificate: &PublisherCertificate) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, certificate)?;
    writer.flush()?;
    Ok(())
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    start_of_day(day) + Duration::days(1) - Duration::seconds(1)
}
