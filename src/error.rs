//! Error types for sensordeck.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (with the `defmt` feature) for efficient
//! on-target logging.

/// Failure of a single bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Address or data byte was not acknowledged.
    Nack,
    /// Bus-level fault (arbitration loss, stuck line, overrun).
    Bus,
    /// The controller gave up waiting.
    Timeout,
    /// Anything the HAL could not classify.
    Other,
}

impl BusError {
    /// Whether the next poll cycle may simply retry.
    ///
    /// Every bus error is transient by policy: a scan that fails now is
    /// repeated on the next cycle and reported as an empty result meanwhile.
    pub fn is_transient(&self) -> bool {
        match self {
            BusError::Nack | BusError::Bus | BusError::Timeout | BusError::Other => true,
        }
    }
}

/// Failure reported by a chart widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChartError {
    /// The widget cannot set an explicit axis range.
    Unsupported,
    /// The series id is unknown to the widget.
    NoSuchSeries,
    /// Drawing or buffering failed.
    Backend,
}

/// Failure of a sensor unit driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Underlying bus transaction failed.
    Bus(BusError),
    /// A response word failed its checksum.
    Crc,
    /// The unit has no new measurement yet.
    NotReady,
    /// The chip identity register holds something else.
    UnknownChip(u8),
}

// Convenience conversions

impl From<BusError> for SensorError {
    fn from(e: BusError) -> Self {
        SensorError::Bus(e)
    }
}

impl From<embedded_hal::i2c::ErrorKind> for BusError {
    fn from(kind: embedded_hal::i2c::ErrorKind) -> Self {
        use embedded_hal::i2c::ErrorKind;
        match kind {
            ErrorKind::NoAcknowledge(_) => BusError::Nack,
            ErrorKind::Bus | ErrorKind::ArbitrationLoss | ErrorKind::Overrun => BusError::Bus,
            _ => BusError::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

    #[test]
    fn i2c_error_kinds_map_to_bus_errors() {
        assert_eq!(
            BusError::from(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
            BusError::Nack
        );
        assert_eq!(BusError::from(ErrorKind::ArbitrationLoss), BusError::Bus);
        assert_eq!(BusError::from(ErrorKind::Other), BusError::Other);
    }

    #[test]
    fn all_bus_errors_are_transient() {
        for e in [BusError::Nack, BusError::Bus, BusError::Timeout, BusError::Other] {
            assert!(e.is_transient());
        }
    }

    #[test]
    fn sensor_error_wraps_bus_error() {
        assert_eq!(
            SensorError::from(BusError::Timeout),
            SensorError::Bus(BusError::Timeout)
        );
    }
}
