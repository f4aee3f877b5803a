//! Record types decoded from snapshot lines.
//!
//! Records are transient: each is built from a single line, handed to the
//! caller's sink, and dropped. Optional date fields are kept as trimmed
//! strings because the snapshot uses all-spaces to mean "unknown", which
//! is distinct from a field being absent.

use std::fmt;

use chrono::NaiveDate;

/// The snapshot header, always the first line of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Production run number.
    pub run: u32,
    /// Date the snapshot was produced.
    pub production_date: NaiveDate,
}

/// The trailer record closing an entry.
///
/// Its declared count must equal the number of company and person records
/// dispatched for the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub record_count: u64,
}

/// A company record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    /// Mostly 8 numeric digits; some numbers carry a registry prefix
    /// (see [`NumberPrefix`]) followed by digits.
    pub company_number: String,
    pub status: CompanyStatus,
    /// Numeric string; the count of officer records for this company.
    pub number_of_officers: String,
    /// Registered name, trimmed of padding. Empty when the declared name
    /// length overran the physical line.
    pub name: String,
}

impl Company {
    /// The registry prefix of the company number, when one is present.
    pub fn number_prefix(&self) -> Option<NumberPrefix> {
        NumberPrefix::of(&self.company_number)
    }
}

/// Company status code from the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyStatus {
    /// `C` - converted or closed company.
    ConvertedClosed,
    /// `D` - dissolved company.
    Dissolved,
    /// `L` - company in liquidation.
    InLiquidation,
    /// `R` - company in receivership.
    InReceivership,
    /// Space - none of the above.
    Unspecified,
}

impl CompanyStatus {
    /// Decode the single status byte at its fixed offset.
    pub fn from_code(code: u8) -> CompanyStatus {
        match code {
            b'C' => CompanyStatus::ConvertedClosed,
            b'D' => CompanyStatus::Dissolved,
            b'L' => CompanyStatus::InLiquidation,
            b'R' => CompanyStatus::InReceivership,
            _ => CompanyStatus::Unspecified,
        }
    }
}

impl fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CompanyStatus::ConvertedClosed => "Converted/closed",
            CompanyStatus::Dissolved => "Dissolved",
            CompanyStatus::InLiquidation => "In liquidation",
            CompanyStatus::InReceivership => "In receivership",
            CompanyStatus::Unspecified => "Unspecified",
        };
        f.write_str(label)
    }
}

/// Registry prefix of a company number.
///
/// Most company numbers are fully numeric; the remainder start with a
/// one- or two-letter prefix identifying the register of origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberPrefix {
    /// Company registered in Scotland.
    Sc,
    /// Scottish company not required to register.
    Sz,
    /// English/Welsh company not required to register.
    Zc,
    /// Overseas company registered in Scotland.
    Sf,
    /// Overseas company registered in England/Wales (before October 2009)
    /// or in the UK (from October 2009).
    Fc,
    /// Company registered in Northern Ireland.
    Ni,
    /// Overseas company registered in Northern Ireland.
    Nf,
    /// LLP registered in England/Wales.
    Oc,
    /// LLP registered in Scotland.
    So,
    /// LLP registered in Northern Ireland.
    Nc,
    /// Societas Europaea/UK Societas.
    Se,
    /// Old company registered in Northern Ireland.
    R,
}

impl NumberPrefix {
    /// Extract the registry prefix from a company number, if present.
    pub fn of(company_number: &str) -> Option<NumberPrefix> {
        let end = company_number
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(company_number.len());
        match &company_number[..end] {
            "SC" => Some(NumberPrefix::Sc),
            "SZ" => Some(NumberPrefix::Sz),
            "ZC" => Some(NumberPrefix::Zc),
            "SF" => Some(NumberPrefix::Sf),
            "FC" => Some(NumberPrefix::Fc),
            "NI" => Some(NumberPrefix::Ni),
            "NF" => Some(NumberPrefix::Nf),
            "OC" => Some(NumberPrefix::Oc),
            "SO" => Some(NumberPrefix::So),
            "NC" => Some(NumberPrefix::Nc),
            "SE" => Some(NumberPrefix::Se),
            "R" => Some(NumberPrefix::R),
            _ => None,
        }
    }

    /// The prefix as it appears in a company number.
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberPrefix::Sc => "SC",
            NumberPrefix::Sz => "SZ",
            NumberPrefix::Zc => "ZC",
            NumberPrefix::Sf => "SF",
            NumberPrefix::Fc => "FC",
            NumberPrefix::Ni => "NI",
            NumberPrefix::Nf => "NF",
            NumberPrefix::Oc => "OC",
            NumberPrefix::So => "SO",
            NumberPrefix::Nc => "NC",
            NumberPrefix::Se => "SE",
            NumberPrefix::R => "R",
        }
    }
}

impl fmt::Display for NumberPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NumberPrefix::Sc => "Company registered in Scotland",
            NumberPrefix::Sz => "Scottish company not required to register",
            NumberPrefix::Zc => "English/Welsh company not required to register",
            NumberPrefix::Sf => "Overseas company registered in Scotland",
            NumberPrefix::Fc => {
                "Overseas company registered in England/Wales (prior to 1st October 2009) \
                 or in the UK (from 1st October 2009)"
            }
            NumberPrefix::Ni => "Company registered in Northern Ireland",
            NumberPrefix::Nf => "Overseas company registered in Northern Ireland",
            NumberPrefix::Oc => "Limited Liability Partnership registered in England/Wales",
            NumberPrefix::So => "Limited Liability Partnership registered in Scotland",
            NumberPrefix::Nc => "Limited Liability Partnership registered in Northern Ireland",
            NumberPrefix::Se => {
                "Societas Europaea/UK Societas registered in England/Wales, Scotland \
                 or Northern Ireland"
            }
            NumberPrefix::R => "Old company registered in Northern Ireland",
        };
        f.write_str(label)
    }
}

/// An officer (person) record.
///
/// All fields are trimmed of padding. Date fields hold `CCYYMMDD` text or
/// are empty when the registry holds no actual date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    pub company_number: String,
    /// Single-digit code for the document the appointment date was taken
    /// from: `1` appointment form, `2` annual return, `3` incorporation
    /// document, `4`/`5` LLP equivalents, `6` overseas-company form.
    pub app_date_origin: String,
    /// Two-digit role/status code: `00`/`01` current secretary/director,
    /// `02`/`03` resigned, `04`-`07` LLP members, `11`-`16` judicial
    /// factors and statutory managers, `17`-`22` SE organ members,
    /// `99` errored appointment.
    pub appointment_type: String,
    /// 12-character unique person identifier.
    pub person_number: String,
    /// `Y` when the officer is a corporate body, otherwise blank.
    pub corporate_indicator: String,
    /// For appointment types 11-13 this is the registration date of the
    /// form, not the appointment itself.
    pub appointment_date: String,
    /// Usually blank: resigned appointments are rarely in a snapshot.
    pub resignation_date: String,
    /// Postcode of the officer's service address.
    pub postcode: String,
    /// `CCYYMM` century/year/month, or empty. May be present without
    /// [`full_date_of_birth`](Self::full_date_of_birth).
    pub partial_date_of_birth: String,
    pub full_date_of_birth: String,
    pub title: String,
    pub forenames: String,
    pub surname: String,
    pub honours: String,
    pub care_of: String,
    pub po_box: String,
    pub address_line1: String,
    pub address_line2: String,
    pub post_town: String,
    pub county: String,
    pub country: String,
    pub occupation: String,
    pub nationality: String,
    /// Usual residential country; only populated when the variable section
    /// carries all fourteen subfields.
    pub res_country: String,
}

impl Person {
    /// Whether the officer is a corporate body rather than a natural person.
    pub fn is_corporate(&self) -> bool {
        self.corporate_indicator == "Y"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_variants() {
        assert_eq!(CompanyStatus::from_code(b'C'), CompanyStatus::ConvertedClosed);
        assert_eq!(CompanyStatus::from_code(b'D'), CompanyStatus::Dissolved);
        assert_eq!(CompanyStatus::from_code(b'L'), CompanyStatus::InLiquidation);
        assert_eq!(CompanyStatus::from_code(b'R'), CompanyStatus::InReceivership);
        assert_eq!(CompanyStatus::from_code(b' '), CompanyStatus::Unspecified);
        assert_eq!(CompanyStatus::from_code(b'X'), CompanyStatus::Unspecified);
    }

    #[test]
    fn status_display_labels() {
        assert_eq!(CompanyStatus::InLiquidation.to_string(), "In liquidation");
        assert_eq!(CompanyStatus::Unspecified.to_string(), "Unspecified");
    }

    #[test]
    fn prefix_of_prefixed_numbers() {
        assert_eq!(NumberPrefix::of("SC123456"), Some(NumberPrefix::Sc));
        assert_eq!(NumberPrefix::of("OC345678"), Some(NumberPrefix::Oc));
        assert_eq!(NumberPrefix::of("R0000001"), Some(NumberPrefix::R));
    }

    #[test]
    fn prefix_of_numeric_number_is_none() {
        assert_eq!(NumberPrefix::of("00463819"), None);
        assert_eq!(NumberPrefix::of(""), None);
    }

    #[test]
    fn prefix_of_unknown_letters_is_none() {
        assert_eq!(NumberPrefix::of("XX123456"), None);
    }

    #[test]
    fn prefix_round_trips_as_str() {
        assert_eq!(NumberPrefix::of("SE000123"), Some(NumberPrefix::Se));
        assert_eq!(NumberPrefix::Se.as_str(), "SE");
    }

    #[test]
    fn corporate_indicator() {
        let mut person = Person::default();
        assert!(!person.is_corporate());
        person.corporate_indicator = "Y".to_string();
        assert!(person.is_corporate());
    }
}
