// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Status record codec

use crate::error::{Error, Result};
use crate::status::VehicleStatus;
use crate::walker::format::{JsonReader, JsonWriter, MsgPackReader, MsgPackWriter, WireFormat};
use crate::walker::{
    deserialize_struct, serialize_struct, Datum, Deserializer, FieldSchema, FieldType,
    Serializer, StructDatum, StructSchema, WalkError, WalkErrorKind,
};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// Sender tag of the simulator side
pub const DEFAULT_SENDER: &str = "carla";

/// Timer value sent along with every status update
pub const DEFAULT_TIME_DATA: &str = "0";

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[day]/[month]/[year] [hour]:[minute]:[second].[subsecond digits:3]");

/// Schema of the record exchanged on the status channel
pub static STATUS_RECORD_SCHEMA: StructSchema = StructSchema {
    name: "StatusRecord",
    fields: &[
        FieldSchema {
            name: "from",
            ty: FieldType::Str,
        },
        FieldSchema {
            name: "timestamp",
            ty: FieldType::Str,
        },
        FieldSchema {
            name: "vehicle_status",
            ty: FieldType::Str,
        },
        FieldSchema {
            name: "time_data",
            ty: FieldType::Str,
        },
    ],
};

/// One status message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecord {
    /// Sender tag
    pub from: String,
    /// Local wall-clock time of sending, `DD/MM/YYYY HH:MM:SS.mmm`
    pub timestamp: String,
    /// Canonical status name
    pub vehicle_status: String,
    /// Schedule timer of the controller
    pub time_data: String,
}

impl StatusRecord {
    /// Status carried by this record, [`VehicleStatus::Unknown`] if not recognized
    pub fn status(&self) -> VehicleStatus {
        VehicleStatus::from_name(&self.vehicle_status)
    }

    fn to_datum(&self) -> Datum {
        let mut record = StructDatum::new(&STATUS_RECORD_SCHEMA);
        record.set("from", Datum::Str(self.from.clone()));
        record.set("timestamp", Datum::Str(self.timestamp.clone()));
        record.set("vehicle_status", Datum::Str(self.vehicle_status.clone()));
        record.set("time_data", Datum::Str(self.time_data.clone()));
        Datum::Struct(record)
    }

    fn from_datum(datum: &Datum) -> Result<Self, WalkError> {
        let record = datum.as_struct().ok_or_else(|| {
            WalkError::new(WalkErrorKind::TypeMismatch, "status record is not a struct")
        })?;
        let field = |name: &str| {
            record
                .get(name)
                .and_then(Datum::as_str)
                .map(str::to_owned)
                .ok_or_else(|| {
                    WalkError::new(
                        WalkErrorKind::TypeMismatch,
                        format!("field '{name}' is not a string"),
                    )
                })
        };
        Ok(StatusRecord {
            from: field("from")?,
            timestamp: field("timestamp")?,
            vehicle_status: field("vehicle_status")?,
            time_data: field("time_data")?,
        })
    }
}

/// Current local time in the status record format. Falls back to UTC if the local
/// offset cannot be determined.
pub fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(TIMESTAMP_FORMAT).unwrap_or_default()
}

/// Encodes outbound and decodes inbound status records
#[derive(Clone)]
pub struct StatusCodec {
    sender: String,
    inbound: WireFormat,
    outbound: WireFormat,
    serializer: Serializer,
    deserializer: Deserializer,
}

impl std::fmt::Debug for StatusCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCodec")
            .field("sender", &self.sender)
            .field("inbound", &self.inbound)
            .field("outbound", &self.outbound)
            .finish()
    }
}

impl Default for StatusCodec {
    fn default() -> Self {
        Builder::default().build()
    }
}

impl StatusCodec {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn inbound(&self) -> WireFormat {
        self.inbound
    }

    pub fn outbound(&self) -> WireFormat {
        self.outbound
    }

    /// Encode a fresh record announcing `status`
    pub fn encode(&self, status: VehicleStatus) -> Result<Vec<u8>> {
        let record = StatusRecord {
            from: self.sender.clone(),
            timestamp: timestamp(),
            vehicle_status: status.name().to_owned(),
            time_data: DEFAULT_TIME_DATA.to_owned(),
        };
        self.encode_record(&record)
    }

    pub fn encode_record(&self, record: &StatusRecord) -> Result<Vec<u8>> {
        let datum = record.to_datum();
        let encoded = match self.outbound {
            WireFormat::MsgPack => serialize_struct(
                &datum,
                &STATUS_RECORD_SCHEMA,
                &mut MsgPackWriter::new(),
                &self.serializer,
            ),
            WireFormat::Json => serialize_struct(
                &datum,
                &STATUS_RECORD_SCHEMA,
                &mut JsonWriter::new(),
                &self.serializer,
            ),
        };
        encoded.map_err(Error::Encode)
    }

    /// Decode an inbound payload. Any structural problem rejects the whole record.
    pub fn decode(&self, bytes: &[u8]) -> Result<StatusRecord, WalkError> {
        let datum = match self.inbound {
            WireFormat::MsgPack => deserialize_struct(
                &mut MsgPackReader::new(bytes),
                &STATUS_RECORD_SCHEMA,
                &self.deserializer,
            )?,
            WireFormat::Json => deserialize_struct(
                &mut JsonReader::new(bytes)?,
                &STATUS_RECORD_SCHEMA,
                &self.deserializer,
            )?,
        };
        StatusRecord::from_datum(&datum)
    }
}

/// Codec builder
#[derive(Debug, Clone)]
pub struct Builder {
    sender: String,
    inbound: WireFormat,
    outbound: WireFormat,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            sender: DEFAULT_SENDER.to_owned(),
            inbound: WireFormat::MsgPack,
            outbound: WireFormat::Json,
        }
    }
}

impl Builder {
    /// Tag put into the `from` field of outbound records
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn inbound(mut self, format: WireFormat) -> Self {
        self.inbound = format;
        self
    }

    pub fn outbound(mut self, format: WireFormat) -> Self {
        self.outbound = format;
        self
    }

    /// Swap inbound and outbound formats, for the controller end of the channel
    pub fn mirrored(mut self) -> Self {
        std::mem::swap(&mut self.inbound, &mut self.outbound);
        self
    }

    pub fn build(self) -> StatusCodec {
        StatusCodec {
            sender: self.sender,
            inbound: self.inbound,
            outbound: self.outbound,
            serializer: Serializer::with_default_handlers(),
            deserializer: Deserializer::with_default_handlers(),
        }
    }
}
