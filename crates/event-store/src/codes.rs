//! Query codes understood by the DIBI v3 API.

use std::fmt;
use std::str::FromStr;

use crate::EventStoreError;

macro_rules! dibi_codes {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($key:literal, $code:literal)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Code sent in query forms.
            pub fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            /// Upper-case key, e.g. `JAWA_BARAT`.
            pub fn key(&self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }

            /// Look a variant up by its numeric code.
            pub fn from_code(code: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.code() == code)
            }
        }

        impl FromStr for $name {
            type Err = EventStoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().replace(' ', "_").to_uppercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.key() == wanted)
                    .ok_or_else(|| {
                        EventStoreError::InvalidQuery(format!("unknown {} '{}'", stringify!($name), s))
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.key())
            }
        }
    };
}

dibi_codes! {
    /// Indonesian provinces.
    Province {
        Aceh => ("ACEH", "11"),
        SumateraUtara => ("SUMATERA_UTARA", "12"),
        SumateraBarat => ("SUMATERA_BARAT", "13"),
        Riau => ("RIAU", "14"),
        Jambi => ("JAMBI", "15"),
        SumateraSelatan => ("SUMATERA_SELATAN", "16"),
        Bengkulu => ("BENGKULU", "17"),
        Lampung => ("LAMPUNG", "18"),
        KepulauanBangkaBelitung => ("KEPULAUAN_BANGKA_BELITUNG", "19"),
        KepulauanRiau => ("KEPULAUAN_RIAU", "21"),
        DkiJakarta => ("DKI_JAKARTA", "31"),
        JawaBarat => ("JAWA_BARAT", "32"),
        JawaTengah => ("JAWA_TENGAH", "33"),
        DiyYogyakarta => ("DIY_YOGYAKARTA", "34"),
        JawaTimur => ("JAWA_TIMUR", "35"),
        Banten => ("BANTEN", "36"),
        Bali => ("BALI", "51"),
        NusaTenggaraBarat => ("NUSA_TENGGARA_BARAT", "52"),
        NusaTenggaraTimur => ("NUSA_TENGGARA_TIMUR", "53"),
        KalimantanBarat => ("KALIMANTAN_BARAT", "61"),
        KalimantanTengah => ("KALIMANTAN_TENGAH", "62"),
        KalimantanSelatan => ("KALIMANTAN_SELATAN", "63"),
        KalimantanTimur => ("KALIMANTAN_TIMUR", "64"),
        KalimantanUtara => ("KALIMANTAN_UTARA", "65"),
        SulawesiUtara => ("SULAWESI_UTARA", "71"),
        SulawesiTengah => ("SULAWESI_TENGAH", "72"),
        SulawesiSelatan => ("SULAWESI_SELATAN", "73"),
        SulawesiTenggara => ("SULAWESI_TENGGARA", "74"),
        Gorontalo => ("GORONTALO", "75"),
        SulawesiBarat => ("SULAWESI_BARAT", "76"),
        Maluku => ("MALUKU", "81"),
        MalukuUtara => ("MALUKU_UTARA", "82"),
        Papua => ("PAPUA", "91"),
        PapuaBarat => ("PAPUA_BARAT", "92"),
        PapuaSelatan => ("PAPUA_SELATAN", "93"),
        PapuaTengah => ("PAPUA_TENGAH", "94"),
        PapuaPegunungan => ("PAPUA_PEGUNUNGAN", "95"),
        PapuaBaratDaya => ("PAPUA_BARAT_DAYA", "96"),
    }
}

dibi_codes! {
    /// Districts (kabupaten and kota) of Jawa Barat.
    JawaBaratDistrict {
        Bogor => ("BOGOR", "01"),
        Sukabumi => ("SUKABUMI", "02"),
        Cianjur => ("CIANJUR", "03"),
        Bandung => ("BANDUNG", "04"),
        Garut => ("GARUT", "05"),
        Tasikmalaya => ("TASIKMALAYA", "06"),
        Ciamis => ("CIAMIS", "07"),
        Kuningan => ("KUNINGAN", "08"),
        Cirebon => ("CIREBON", "09"),
        Majalengka => ("MAJALENGKA", "10"),
        Sumedang => ("SUMEDANG", "11"),
        Indramayu => ("INDRAMAYU", "12"),
        Subang => ("SUBANG", "13"),
        Purwakarta => ("PURWAKARTA", "14"),
        Karawang => ("KARAWANG", "15"),
        Bekasi => ("BEKASI", "16"),
        BandungBarat => ("BANDUNG_BARAT", "17"),
        Pangandaran => ("PANGANDARAN", "18"),
        KotaBogor => ("KOTA_BOGOR", "71"),
        KotaSukabumi => ("KOTA_SUKABUMI", "72"),
        KotaBandung => ("KOTA_BANDUNG", "73"),
        KotaCirebon => ("KOTA_CIREBON", "74"),
        KotaBekasi => ("KOTA_BEKASI", "75"),
        KotaDepok => ("KOTA_DEPOK", "76"),
        KotaCimahi => ("KOTA_CIMAHI", "77"),
        KotaTasikmalaya => ("KOTA_TASIKMALAYA", "78"),
        KotaBanjar => ("KOTA_BANJAR", "79"),
    }
}

dibi_codes! {
    /// Disaster categories.
    DisasterType {
        Flood => ("FLOOD", "101"),
    }
}

/// Java provinces plus Bali, the set used for backtesting.
pub const BACKTEST_PROVINCES: [Province; 7] = [
    Province::Banten,
    Province::Bali,
    Province::DkiJakarta,
    Province::JawaBarat,
    Province::JawaTengah,
    Province::JawaTimur,
    Province::DiyYogyakarta,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_province_codes() {
        assert_eq!(Province::JawaBarat.code(), "32");
        assert_eq!(Province::from_code("36"), Some(Province::Banten));
        assert_eq!(Province::ALL.len(), 38);
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!("jawa barat".parse::<Province>().unwrap(), Province::JawaBarat);
        assert_eq!("DIY_YOGYAKARTA".parse::<Province>().unwrap(), Province::DiyYogyakarta);
        assert_eq!("KOTA_CIMAHI".parse::<JawaBaratDistrict>().unwrap(), JawaBaratDistrict::KotaCimahi);
        assert!("ATLANTIS".parse::<Province>().is_err());
    }

    #[test]
    fn test_every_province_maps_to_gadm() {
        for province in Province::ALL {
            assert!(
                areas::gadm_province_name(province.key()).is_some(),
                "{} has no GADM province",
                province
            );
        }
    }
}
