//! Layered geo-inference from free text.
//!
//! Three ordered tiers, first tier with any hit wins (no fallthrough):
//! 1. entity: named mines/companies, lowercased substring, first listed entry wins;
//! 2. region: sub-national regex patterns, every hit adds its ISO-2, centroid from the first;
//! 3. country: country-name regex patterns, same policy as regions.
//!
//! Nothing matched → no countries, no centroid, precision `global`.
//! Coordinates are coarse centroids, not geocoding.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which lookup tier produced a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Entity,
    Region,
    Country,
    Global,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Entity => "entity",
            Precision::Region => "region",
            Precision::Country => "country",
            Precision::Global => "global",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// A named asset or company: keyword → one or more countries + fixed centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub keyword: String,
    pub countries: Vec<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// A region or country: regex pattern → one ISO-2 + centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSpec {
    pub pattern: String,
    pub iso2: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone)]
struct PlaceRule {
    re: Regex,
    spec: PlaceSpec,
}

/// Result of `GeoResolver::resolve`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMatch {
    pub countries: Vec<String>,
    pub centroid: Option<Centroid>,
    pub precision: Precision,
}

impl GeoMatch {
    pub fn global() -> Self {
        Self {
            countries: Vec::new(),
            centroid: None,
            precision: Precision::Global,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeoResolver {
    entities: Vec<EntitySpec>,
    regions: Vec<PlaceRule>,
    countries: Vec<PlaceRule>,
}

impl GeoResolver {
    /// Compile custom tables. Order within each table is priority order.
    pub fn new(
        entities: Vec<EntitySpec>,
        regions: Vec<PlaceSpec>,
        countries: Vec<PlaceSpec>,
    ) -> Result<Self, regex::Error> {
        let entities = entities
            .into_iter()
            .map(|mut e| {
                e.keyword = e.keyword.to_lowercase();
                e
            })
            .filter(|e| !e.keyword.is_empty())
            .collect();
        Ok(Self {
            entities,
            regions: compile(regions)?,
            countries: compile(countries)?,
        })
    }

    /// Built-in copper tables.
    pub fn builtin() -> Self {
        Self::new(seed_entities(), seed_regions(), seed_countries())
            .expect("built-in geo patterns compile")
    }

    pub fn resolve(&self, text: &str) -> GeoMatch {
        let lower = text.to_lowercase();

        if let Some(e) = self
            .entities
            .iter()
            .find(|e| lower.contains(e.keyword.as_str()))
        {
            return GeoMatch {
                countries: e.countries.clone(),
                centroid: Some(Centroid {
                    name: e.name.clone(),
                    lat: e.lat,
                    lon: e.lon,
                }),
                precision: Precision::Entity,
            };
        }

        if let Some(m) = match_places(&self.regions, text, Precision::Region) {
            return m;
        }
        if let Some(m) = match_places(&self.countries, text, Precision::Country) {
            return m;
        }
        GeoMatch::global()
    }
}

impl Default for GeoResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

fn compile(specs: Vec<PlaceSpec>) -> Result<Vec<PlaceRule>, regex::Error> {
    specs
        .into_iter()
        .map(|spec| {
            Ok(PlaceRule {
                re: Regex::new(&spec.pattern)?,
                spec,
            })
        })
        .collect()
}

fn match_places(rules: &[PlaceRule], text: &str, precision: Precision) -> Option<GeoMatch> {
    let mut countries: Vec<String> = Vec::new();
    let mut centroid: Option<Centroid> = None;

    for rule in rules.iter().filter(|r| r.re.is_match(text)) {
        if centroid.is_none() {
            centroid = Some(Centroid {
                name: rule.spec.name.clone(),
                lat: rule.spec.lat,
                lon: rule.spec.lon,
            });
        }
        if !countries.contains(&rule.spec.iso2) {
            countries.push(rule.spec.iso2.clone());
        }
    }

    centroid.map(|c| GeoMatch {
        countries,
        centroid: Some(c),
        precision,
    })
}

/// `[geo]` config section. Each omitted tier keeps its built-in table;
/// a listed tier replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub entities: Option<Vec<EntitySpec>>,
    pub regions: Option<Vec<PlaceSpec>>,
    pub countries: Option<Vec<PlaceSpec>>,
}

impl GeoConfig {
    pub fn resolver(&self) -> Result<GeoResolver, regex::Error> {
        GeoResolver::new(
            self.entities.clone().unwrap_or_else(seed_entities),
            self.regions.clone().unwrap_or_else(seed_regions),
            self.countries.clone().unwrap_or_else(seed_countries),
        )
    }
}

/* ----------------------------
Built-in reference tables
---------------------------- */

fn entity(keyword: &str, countries: &[&str], name: &str, lat: f64, lon: f64) -> EntitySpec {
    EntitySpec {
        keyword: keyword.to_string(),
        countries: countries.iter().map(|c| c.to_string()).collect(),
        name: name.to_string(),
        lat,
        lon,
    }
}

fn place(pattern: &str, iso2: &str, name: &str, lat: f64, lon: f64) -> PlaceSpec {
    PlaceSpec {
        pattern: pattern.to_string(),
        iso2: iso2.to_string(),
        name: name.to_string(),
        lat,
        lon,
    }
}

fn seed_entities() -> Vec<EntitySpec> {
    vec![
        entity("codelco", &["CL"], "Codelco, Chile", -35.6751, -71.5430),
        entity("escondida", &["CL"], "Escondida mine, Chile", -24.2700, -69.0700),
        entity("chuquicamata", &["CL"], "Chuquicamata mine, Chile", -22.3100, -68.9000),
        entity("el teniente", &["CL"], "El Teniente mine, Chile", -34.0900, -70.3500),
        entity("collahuasi", &["CL"], "Collahuasi mine, Chile", -20.9800, -68.7200),
        entity("los pelambres", &["CL"], "Los Pelambres mine, Chile", -31.7200, -70.4900),
        entity("antofagasta plc", &["CL"], "Antofagasta plc, Chile", -23.6500, -70.4000),
        entity("grasberg", &["ID"], "Grasberg mine, Indonesia", -4.0500, 137.1100),
        entity("freeport-mcmoran", &["US", "ID"], "Freeport-McMoRan", 33.4484, -112.0740),
        entity("kamoa-kakula", &["CD"], "Kamoa-Kakula, DR Congo", -10.7700, 25.2800),
        entity("ivanhoe mines", &["CD"], "Ivanhoe Mines, DR Congo", -10.7700, 25.2800),
        entity("tenke fungurume", &["CD"], "Tenke Fungurume, DR Congo", -10.5800, 26.1700),
        entity("kansanshi", &["ZM"], "Kansanshi mine, Zambia", -12.0900, 26.4300),
        entity("first quantum", &["ZM", "PA"], "First Quantum Minerals", -12.0900, 26.4300),
        entity("cobre panama", &["PA"], "Cobre Panama mine", 8.8300, -80.6500),
        entity("cobre panamá", &["PA"], "Cobre Panama mine", 8.8300, -80.6500),
        entity("las bambas", &["PE"], "Las Bambas mine, Peru", -14.0800, -72.3300),
        entity("antamina", &["PE"], "Antamina mine, Peru", -9.5400, -77.0500),
        entity("cerro verde", &["PE"], "Cerro Verde mine, Peru", -16.5300, -71.6000),
        entity("southern copper", &["PE", "MX"], "Southern Copper", -17.2500, -70.6100),
        entity("oyu tolgoi", &["MN"], "Oyu Tolgoi mine, Mongolia", 43.0100, 106.8500),
        entity("bingham canyon", &["US"], "Bingham Canyon mine, Utah", 40.5200, -112.1500),
        entity("olympic dam", &["AU"], "Olympic Dam, South Australia", -30.4400, 136.8800),
        entity("cananea", &["MX"], "Buenavista del Cobre (Cananea), Mexico", 30.9800, -110.3000),
        entity("kghm", &["PL"], "KGHM, Poland", 51.4000, 16.2000),
        entity("norilsk", &["RU"], "Norilsk, Russia", 69.3500, 88.2000),
        entity("zijin", &["CN"], "Zijin Mining, China", 25.0600, 116.4200),
    ]
}

fn seed_regions() -> Vec<PlaceSpec> {
    vec![
        place(r"(?i)\bantofagasta\b", "CL", "Antofagasta, Chile", -23.6500, -70.4000),
        place(r"(?i)\batacama\b", "CL", "Atacama, Chile", -27.3668, -70.3314),
        place(r"(?i)\btarapac[aá]\b", "CL", "Tarapaca, Chile", -20.2100, -69.3300),
        place(r"(?i)\bcopperbelt\b", "ZM", "Copperbelt, Zambia", -12.8000, 28.2000),
        place(r"(?i)\bnorth-?western province\b", "ZM", "North-Western Province, Zambia", -13.0000, 25.0000),
        place(r"(?i)\b(lualaba|kolwezi)\b", "CD", "Lualaba, DR Congo", -10.7100, 25.4700),
        place(r"(?i)\b(haut-katanga|katanga|lubumbashi)\b", "CD", "Katanga, DR Congo", -11.6600, 27.4800),
        place(r"(?i)\bapur[ií]mac\b", "PE", "Apurimac, Peru", -14.0500, -73.0900),
        place(r"(?i)\barequipa\b", "PE", "Arequipa, Peru", -16.4100, -71.5400),
        place(r"(?i)\bcusco\b", "PE", "Cusco, Peru", -13.5300, -71.9700),
        place(r"(?i)\b(central papua|mimika)\b", "ID", "Central Papua, Indonesia", -4.2700, 138.0800),
        place(r"(?i)\bsonora\b", "MX", "Sonora, Mexico", 29.2970, -110.3300),
        place(r"(?i)\barizona\b", "US", "Arizona, US", 34.0500, -111.0900),
        place(r"(?i)\butah\b", "US", "Utah, US", 39.3200, -111.0900),
        place(r"(?i)\b(south gobi|[oö]mn[oö]gov[ií])\b", "MN", "South Gobi, Mongolia", 43.5000, 104.0000),
        place(r"(?i)\btibet\b", "CN", "Tibet, China", 29.6500, 91.1000),
        place(r"(?i)\bsouth australia\b", "AU", "South Australia", -30.0000, 136.2100),
        place(r"(?i)\b(lower silesia|legnica)\b", "PL", "Lower Silesia, Poland", 51.2100, 16.1600),
        place(r"(?i)\bbritish columbia\b", "CA", "British Columbia, Canada", 53.7300, -127.6500),
        place(r"(?i)\b(krasnoyarsk|taimyr)\b", "RU", "Krasnoyarsk Krai, Russia", 64.2500, 95.1100),
    ]
}

fn seed_countries() -> Vec<PlaceSpec> {
    vec![
        place(r"(?i)\bchile(an)?\b", "CL", "Chile", -35.6751, -71.5430),
        place(r"(?i)\bperu(vian)?\b", "PE", "Peru", -9.1900, -75.0152),
        place(
            r"(?i)(\bdemocratic republic of (the )?congo\b|\bdrc\b|\bdr congo\b|\bcongolese\b)",
            "CD",
            "DR Congo",
            -4.0383,
            21.7587,
        ),
        place(r"(?i)\bzambia(n)?\b", "ZM", "Zambia", -13.1339, 27.8493),
        place(r"(?i)\b(china|chinese|beijing)\b", "CN", "China", 35.8617, 104.1954),
        place(r"(?i)(\bunited states\b|\bu\.s\.|\busa\b|\bwashington\b)", "US", "United States", 37.0902, -95.7129),
        place(r"(?i)\bindonesia(n)?\b", "ID", "Indonesia", -0.7893, 113.9213),
        place(r"(?i)\baustralia(n)?\b", "AU", "Australia", -25.2744, 133.7751),
        place(r"(?i)\bmexic(o|an)\b", "MX", "Mexico", 23.6345, -102.5528),
        place(r"(?i)\bpanama(nian)?\b", "PA", "Panama", 8.5380, -80.7821),
        place(r"(?i)\bmongolia(n)?\b", "MN", "Mongolia", 46.8625, 103.8467),
        place(r"(?i)\bcanad(a|ian)\b", "CA", "Canada", 56.1304, -106.3468),
        place(r"(?i)\b(russia|russian|moscow)\b", "RU", "Russia", 61.5240, 105.3188),
        place(r"(?i)\bkazakh(stan)?\b", "KZ", "Kazakhstan", 48.0196, 66.9237),
        place(r"(?i)\bpoland\b", "PL", "Poland", 51.9194, 19.1451),
        place(r"(?i)\bpapua new guinea\b", "PG", "Papua New Guinea", -6.3150, 143.9555),
        place(r"(?i)\bargentin(a|e)\b", "AR", "Argentina", -38.4161, -63.6167),
        place(r"(?i)\becuador\b", "EC", "Ecuador", -1.8312, -78.1834),
        place(r"(?i)\bserbia\b", "RS", "Serbia", 44.0165, 21.0059),
        place(r"(?i)\bsouth africa\b", "ZA", "South Africa", -30.5595, 22.9375),
        place(r"(?i)\bjapan(ese)?\b", "JP", "Japan", 36.2048, 138.2529),
        place(r"(?i)\bindia\b", "IN", "India", 20.5937, 78.9629),
        place(r"(?i)\bgermany\b", "DE", "Germany", 51.1657, 10.4515),
    ]
}
