//! Table whitelist and the SQL issued against the measurement database.
//!
//! Every statement is a constant: request input only ever reaches `SQLite`
//! as a bound parameter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The five browsable tables of the measurement database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Table {
    /// Measurement stations.
    Site,
    /// Air-quality surveillance zones.
    Zas,
    /// Operating bodies.
    Organisme,
    /// Tracked pollutants.
    Polluant,
    /// Individual measurements.
    Mesure,
}

impl Table {
    /// All tables, in menu order.
    pub const ALL: [Table; 5] = [
        Table::Site,
        Table::Zas,
        Table::Organisme,
        Table::Polluant,
        Table::Mesure,
    ];

    /// The table name as stored in the database.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Site => "Site",
            Self::Zas => "Zas",
            Self::Organisme => "Organisme",
            Self::Polluant => "Polluant",
            Self::Mesure => "Mesure",
        }
    }

    /// Columns in natural order.
    #[must_use]
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Site => &["id_site", "nom_site", "code_site", "type_implant", "id_zas"],
            Self::Zas => &["id_zas", "code_zas", "Zas"],
            Self::Organisme => &["id_organisme", "nom_organisme", "id_zas"],
            Self::Polluant => &["id_polluant", "nom_polluant"],
            Self::Mesure => &[
                "id_mesure",
                "id_site",
                "id_polluant",
                "date_debut",
                "date_fin",
                "valeur",
                "valeur_brute",
                "unite_mesure",
                "code_qualite",
            ],
        }
    }

    /// Columns matched by free-text search.
    #[must_use]
    pub fn search_columns(self) -> &'static [&'static str] {
        match self {
            Self::Site => &["nom_site"],
            Self::Zas => &["code_zas", "Zas"],
            Self::Organisme => &["nom_organisme"],
            Self::Polluant => &["nom_polluant"],
            Self::Mesure => &["id_mesure", "id_site", "id_polluant"],
        }
    }

    /// `SELECT` of every column, bound as `?1 = limit`.
    #[must_use]
    pub fn select_sql(self) -> &'static str {
        match self {
            Self::Site => SELECT_SITE,
            Self::Zas => SELECT_ZAS,
            Self::Organisme => SELECT_ORGANISME,
            Self::Polluant => SELECT_POLLUANT,
            Self::Mesure => SELECT_MESURE,
        }
    }

    /// Partial-match search, bound as `?1 = pattern`, `?2 = limit`.
    #[must_use]
    pub fn search_sql(self) -> &'static str {
        match self {
            Self::Site => SEARCH_SITE,
            Self::Zas => SEARCH_ZAS,
            Self::Organisme => SEARCH_ORGANISME,
            Self::Polluant => SEARCH_POLLUANT,
            Self::Mesure => SEARCH_MESURE,
        }
    }

    /// Row count.
    #[must_use]
    pub fn count_sql(self) -> &'static str {
        match self {
            Self::Site => "SELECT COUNT(*) FROM Site",
            Self::Zas => "SELECT COUNT(*) FROM Zas",
            Self::Organisme => "SELECT COUNT(*) FROM Organisme",
            Self::Polluant => "SELECT COUNT(*) FROM Polluant",
            Self::Mesure => "SELECT COUNT(*) FROM Mesure",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.name() == s)
            .ok_or_else(|| Error::invalid_table_name(s))
    }
}

const SELECT_SITE: &str =
    "SELECT id_site, nom_site, code_site, type_implant, id_zas FROM Site LIMIT ?1";

const SELECT_ZAS: &str = "SELECT id_zas, code_zas, Zas FROM Zas LIMIT ?1";

const SELECT_ORGANISME: &str =
    "SELECT id_organisme, nom_organisme, id_zas FROM Organisme LIMIT ?1";

const SELECT_POLLUANT: &str = "SELECT id_polluant, nom_polluant FROM Polluant LIMIT ?1";

const SELECT_MESURE: &str = r"
SELECT id_mesure, id_site, id_polluant, date_debut, date_fin,
       valeur, valeur_brute, unite_mesure, code_qualite
FROM Mesure LIMIT ?1
";

/// SQL function applied to every search column, registered per connection
/// by the search path. `SQLite` only folds ASCII case in `LIKE`.
pub const FOLD_CASE: &str = "fold_case";

const SEARCH_SITE: &str = r"
SELECT id_site, nom_site, code_site, type_implant, id_zas FROM Site
WHERE fold_case(nom_site) LIKE ?1 ESCAPE '\'
LIMIT ?2
";

const SEARCH_ZAS: &str = r"
SELECT id_zas, code_zas, Zas FROM Zas
WHERE fold_case(code_zas) LIKE ?1 ESCAPE '\' OR fold_case(Zas) LIKE ?1 ESCAPE '\'
LIMIT ?2
";

const SEARCH_ORGANISME: &str = r"
SELECT id_organisme, nom_organisme, id_zas FROM Organisme
WHERE fold_case(nom_organisme) LIKE ?1 ESCAPE '\'
LIMIT ?2
";

const SEARCH_POLLUANT: &str = r"
SELECT id_polluant, nom_polluant FROM Polluant
WHERE fold_case(nom_polluant) LIKE ?1 ESCAPE '\'
LIMIT ?2
";

const SEARCH_MESURE: &str = r"
SELECT id_mesure, id_site, id_polluant, date_debut, date_fin,
       valeur, valeur_brute, unite_mesure, code_qualite
FROM Mesure
WHERE fold_case(id_mesure) LIKE ?1 ESCAPE '\'
   OR fold_case(id_site) LIKE ?1 ESCAPE '\'
   OR fold_case(id_polluant) LIKE ?1 ESCAPE '\'
LIMIT ?2
";

/// Zones as (code, name), by display name.
pub const LIST_ZONES: &str = "SELECT code_zas, Zas FROM Zas ORDER BY Zas";

/// Zones as (id, code, name), by display name.
pub const LIST_ZONES_WITH_ID: &str = "SELECT id_zas, code_zas, Zas FROM Zas ORDER BY Zas";

/// Measurements of one zone joined with their site and pollutant.
///
/// Dates are truncated to the day and rendered `YYYY-MM-DD` whether the
/// stored timestamp uses `/` or `-` separators.
pub const FILTERED_MEASUREMENTS: &str = r"
SELECT
    Z.Zas,
    S.nom_site,
    replace(substr(M.date_debut, 1, 10), '/', '-') AS date_debut,
    replace(substr(M.date_fin, 1, 10), '/', '-') AS date_fin,
    P.nom_polluant,
    M.valeur,
    M.valeur_brute,
    M.unite_mesure,
    M.code_qualite
FROM Site S
INNER JOIN Zas Z ON S.id_zas = Z.id_zas
INNER JOIN Mesure M ON S.id_site = M.id_site
INNER JOIN Polluant P ON M.id_polluant = P.id_polluant
WHERE Z.code_zas = ?1
ORDER BY M.valeur ASC
LIMIT ?2
";

/// Pollutant name and raw value of every measurement in a window.
pub const SAMPLES_ALL_ZONES: &str = r"
SELECT P.nom_polluant, M.valeur
FROM Mesure M
INNER JOIN Site S ON M.id_site = S.id_site
INNER JOIN Zas Z ON Z.id_zas = S.id_zas
INNER JOIN Polluant P ON P.id_polluant = M.id_polluant
WHERE M.date_debut BETWEEN ?1 AND ?2
ORDER BY M.date_debut
";

/// Same as [`SAMPLES_ALL_ZONES`], restricted to one zone id (`?3`).
pub const SAMPLES_ONE_ZONE: &str = r"
SELECT P.nom_polluant, M.valeur
FROM Mesure M
INNER JOIN Site S ON M.id_site = S.id_site
INNER JOIN Zas Z ON Z.id_zas = S.id_zas
INNER JOIN Polluant P ON P.id_polluant = M.id_polluant
WHERE M.date_debut BETWEEN ?1 AND ?2 AND Z.id_zas = ?3
ORDER BY M.date_debut
";

/// Escape `LIKE` wildcards in user text and wrap it for a substring match.
///
/// The text is lowercased to match columns passed through [`FOLD_CASE`].
#[must_use]
pub fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
