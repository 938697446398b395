//! Перечисляемые поля SIGPROC заголовка: телескоп, бэкенд, тип данных.

use serde::Serialize;

/// Идентификатор телескопа (`telescope_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Telescope {
    Fake,
    Arecibo,
    Ooty,
    Nancay,
    Parkes,
    Jodrell,
    /// Green Bank Telescope
    Gbt,
    Gmrt,
    Effelsberg,
    Ata,
    Srt,
    Lofar,
    Vla,
    Chime,
    Fast,
    MeerKat,
    /// Код, которого нет в таблице
    Other(i32),
}

/// Идентификатор бэкенда (`machine_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Machine {
    Fake,
    Pspm,
    Wapp,
    Aoftm,
    Bcpm1,
    Ooty,
    Scamp,
    GmrtFb,
    Pulsar2000,
    Other(i32),
}

/// Тип содержимого файла (`data_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum DataType {
    /// Неуточнённые сырые данные
    Raw = 0,
    /// Фильтербанк (спектры)
    Filterbank = 1,
    /// Временной ряд
    TimeSeries = 2,
}

impl Telescope {
    pub fn from_i32(v: i32) -> Self {
        match v {
            0 => Telescope::Fake,
            1 => Telescope::Arecibo,
            2 => Telescope::Ooty,
            3 => Telescope::Nancay,
            4 => Telescope::Parkes,
            5 => Telescope::Jodrell,
            6 => Telescope::Gbt,
            7 => Telescope::Gmrt,
            8 => Telescope::Effelsberg,
            9 => Telescope::Ata,
            10 => Telescope::Srt,
            11 => Telescope::Lofar,
            12 => Telescope::Vla,
            20 => Telescope::Chime,
            21 => Telescope::Fast,
            64 => Telescope::MeerKat,
            other => Telescope::Other(other),
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Telescope::Fake => 0,
            Telescope::Arecibo => 1,
            Telescope::Ooty => 2,
            Telescope::Nancay => 3,
            Telescope::Parkes => 4,
            Telescope::Jodrell => 5,
            Telescope::Gbt => 6,
            Telescope::Gmrt => 7,
            Telescope::Effelsberg => 8,
            Telescope::Ata => 9,
            Telescope::Srt => 10,
            Telescope::Lofar => 11,
            Telescope::Vla => 12,
            Telescope::Chime => 20,
            Telescope::Fast => 21,
            Telescope::MeerKat => 64,
            Telescope::Other(v) => *v,
        }
    }
}

impl Machine {
    pub fn from_i32(v: i32) -> Self {
        match v {
            0 => Machine::Fake,
            1 => Machine::Pspm,
            2 => Machine::Wapp,
            3 => Machine::Aoftm,
            4 => Machine::Bcpm1,
            5 => Machine::Ooty,
            6 => Machine::Scamp,
            7 => Machine::GmrtFb,
            8 => Machine::Pulsar2000,
            other => Machine::Other(other),
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Machine::Fake => 0,
            Machine::Pspm => 1,
            Machine::Wapp => 2,
            Machine::Aoftm => 3,
            Machine::Bcpm1 => 4,
            Machine::Ooty => 5,
            Machine::Scamp => 6,
            Machine::GmrtFb => 7,
            Machine::Pulsar2000 => 8,
            Machine::Other(v) => *v,
        }
    }
}

impl DataType {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(DataType::Raw),
            1 => Some(DataType::Filterbank),
            2 => Some(DataType::TimeSeries),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }
}

////////////////////////////////////////////////////////////////////////////////
// Display / FromStr
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for Telescope {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Telescope::Fake => write!(f, "fake"),
            Telescope::Arecibo => write!(f, "arecibo"),
            Telescope::Ooty => write!(f, "ooty"),
            Telescope::Nancay => write!(f, "nancay"),
            Telescope::Parkes => write!(f, "parkes"),
            Telescope::Jodrell => write!(f, "jodrell"),
            Telescope::Gbt => write!(f, "gbt"),
            Telescope::Gmrt => write!(f, "gmrt"),
            Telescope::Effelsberg => write!(f, "effelsberg"),
            Telescope::Ata => write!(f, "ata"),
            Telescope::Srt => write!(f, "srt"),
            Telescope::Lofar => write!(f, "lofar"),
            Telescope::Vla => write!(f, "vla"),
            Telescope::Chime => write!(f, "chime"),
            Telescope::Fast => write!(f, "fast"),
            Telescope::MeerKat => write!(f, "meerkat"),
            Telescope::Other(v) => write!(f, "{v}"),
        }
    }
}

impl std::str::FromStr for Telescope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fake" => Ok(Telescope::Fake),
            "arecibo" | "ao" => Ok(Telescope::Arecibo),
            "ooty" => Ok(Telescope::Ooty),
            "nancay" => Ok(Telescope::Nancay),
            "parkes" | "pks" => Ok(Telescope::Parkes),
            "jodrell" | "jodrell bank" | "jb" => Ok(Telescope::Jodrell),
            "gbt" | "gb" | "green bank" => Ok(Telescope::Gbt),
            "gmrt" => Ok(Telescope::Gmrt),
            "effelsberg" | "eff" => Ok(Telescope::Effelsberg),
            "ata" => Ok(Telescope::Ata),
            "srt" => Ok(Telescope::Srt),
            "lofar" => Ok(Telescope::Lofar),
            "vla" => Ok(Telescope::Vla),
            "chime" => Ok(Telescope::Chime),
            "fast" => Ok(Telescope::Fast),
            "meerkat" => Ok(Telescope::MeerKat),
            other => other.parse::<i32>().map(Telescope::from_i32).map_err(|_| {
                format!("Unknown telescope: '{s}'. Use a name (gbt, parkes, ...) or a numeric id")
            }),
        }
    }
}

impl std::fmt::Display for Machine {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Machine::Fake => write!(f, "fake"),
            Machine::Pspm => write!(f, "pspm"),
            Machine::Wapp => write!(f, "wapp"),
            Machine::Aoftm => write!(f, "aoftm"),
            Machine::Bcpm1 => write!(f, "bcpm1"),
            Machine::Ooty => write!(f, "ooty"),
            Machine::Scamp => write!(f, "scamp"),
            Machine::GmrtFb => write!(f, "gmrtfb"),
            Machine::Pulsar2000 => write!(f, "pulsar2000"),
            Machine::Other(v) => write!(f, "{v}"),
        }
    }
}

impl std::str::FromStr for Machine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fake" => Ok(Machine::Fake),
            "pspm" => Ok(Machine::Pspm),
            "wapp" => Ok(Machine::Wapp),
            "aoftm" => Ok(Machine::Aoftm),
            "bcpm1" | "bcpm" => Ok(Machine::Bcpm1),
            "ooty" => Ok(Machine::Ooty),
            "scamp" => Ok(Machine::Scamp),
            "gmrtfb" => Ok(Machine::GmrtFb),
            "pulsar2000" => Ok(Machine::Pulsar2000),
            other => other.parse::<i32>().map(Machine::from_i32).map_err(|_| {
                format!("Unknown machine: '{s}'. Use a name (fake, wapp, ...) or a numeric id")
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telescope_ids_round_trip() {
        for id in [0, 1, 4, 6, 12, 21, 64, 99] {
            assert_eq!(Telescope::from_i32(id).as_i32(), id);
        }
        assert_eq!(Telescope::from_i32(6), Telescope::Gbt);
        assert_eq!(Telescope::from_i32(99), Telescope::Other(99));
    }

    #[test]
    fn test_telescope_fromstr() {
        assert_eq!("GBT".parse::<Telescope>().unwrap(), Telescope::Gbt);
        assert_eq!("parkes".parse::<Telescope>().unwrap(), Telescope::Parkes);
        assert_eq!("6".parse::<Telescope>().unwrap(), Telescope::Gbt);
        assert!("atlantis".parse::<Telescope>().is_err());
    }

    #[test]
    fn test_machine_fromstr() {
        assert_eq!("fake".parse::<Machine>().unwrap(), Machine::Fake);
        assert_eq!("2".parse::<Machine>().unwrap(), Machine::Wapp);
        assert!("spigotz".parse::<Machine>().is_err());
    }

    #[test]
    fn test_data_type() {
        assert_eq!(DataType::from_i32(1), Some(DataType::Filterbank));
        assert_eq!(DataType::Raw.as_i32(), 0);
        assert_eq!(DataType::from_i32(7), None);
    }
}
