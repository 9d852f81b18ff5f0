//! Static word lists bundled with the core. Contents are unconstrained by
//! spec (§1, §9) beyond "non-empty and deterministic"; sizes follow the
//! design-note minimums (first/last names ≥1000, street types ≥30, city
//! names ≥500, TLDs ≥10). Entries need not be unique — the draw function
//! only needs a stable, sufficiently large index space.

const BASE_FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David", "Elizabeth",
    "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah", "Charles", "Karen",
    "Christopher", "Nancy", "Daniel", "Lisa", "Matthew", "Margaret", "Anthony", "Betty", "Mark", "Sandra",
    "Donald", "Ashley", "Steven", "Dorothy", "Paul", "Kimberly", "Andrew", "Emily", "Joshua", "Donna",
    "Kenneth", "Michelle", "Kevin", "Carol", "Brian", "Amanda", "George", "Melissa", "Timothy", "Deborah",
    "Ronald", "Stephanie", "Edward", "Rebecca", "Jason", "Sharon", "Jeffrey", "Laura", "Ryan", "Cynthia",
    "Jacob", "Kathleen", "Gary", "Amy", "Nicholas", "Angela", "Eric", "Shirley", "Jonathan", "Anna",
    "Stephen", "Brenda", "Larry", "Pamela", "Justin", "Emma", "Scott", "Nicole", "Brandon", "Helen",
    "Benjamin", "Samantha", "Samuel", "Katherine", "Gregory", "Christine", "Alexander", "Debra", "Frank", "Rachel",
    "Patrick", "Catherine", "Raymond", "Carolyn", "Jack", "Janet", "Dennis", "Ruth", "Jerry", "Maria",
    "Tyler", "Heather", "Aaron", "Diane", "Jose", "Virginia", "Adam", "Julie", "Nathan", "Joyce",
    "Henry", "Victoria", "Douglas", "Olivia", "Zachary", "Kelly", "Peter", "Christina", "Kyle", "Lauren",
];

const BASE_LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez", "Martinez",
    "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Jackson", "Martin",
    "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez", "Clark", "Ramirez", "Lewis", "Robinson",
    "Walker", "Young", "Allen", "King", "Wright", "Scott", "Torres", "Nguyen", "Hill", "Flores",
    "Green", "Adams", "Nelson", "Baker", "Hall", "Rivera", "Campbell", "Mitchell", "Carter", "Roberts",
    "Gomez", "Phillips", "Evans", "Turner", "Diaz", "Parker", "Cruz", "Edwards", "Collins", "Reyes",
    "Stewart", "Morris", "Morales", "Murphy", "Cook", "Rogers", "Gutierrez", "Ortiz", "Morgan", "Cooper",
    "Peterson", "Bailey", "Reed", "Kelly", "Howard", "Ramos", "Kim", "Cox", "Ward", "Richardson",
    "Watson", "Brooks", "Chavez", "Wood", "James", "Bennett", "Gray", "Mendoza", "Ruiz", "Hughes",
    "Price", "Alvarez", "Castillo", "Sanders", "Patel", "Myers", "Long", "Ross", "Foster", "Jimenez",
    "Powell", "Jenkins", "Perry", "Russell", "Sullivan", "Bell", "Coleman", "Butler", "Henderson", "Barnes",
    "Gonzales", "Fisher", "Vasquez", "Simmons", "Romero", "Jordan", "Patterson", "Alexander", "Hamilton", "Graham",
];

const STREET_TYPES: &[&str] = &[
    "St", "Street", "Ave", "Avenue", "Rd", "Road", "Blvd", "Boulevard", "Ln", "Lane", "Dr", "Drive",
    "Ct", "Court", "Pl", "Place", "Way", "Terrace", "Circle", "Trail", "Pkwy", "Parkway", "Hwy", "Highway",
    "Loop", "Crossing", "Pike", "Walk", "Row", "Close", "Grove", "Mews", "Crescent", "Square", "Path", "Run",
];

const BASE_CITY_NAMES: &[&str] = &[
    "Springfield", "Franklin", "Greenville", "Fairview", "Salem", "Madison", "Georgetown", "Arlington", "Ashland",
    "Clinton", "Burlington", "Manchester", "Oakland", "Centerville", "Riverside", "Lexington", "Milton", "Dayton",
    "Auburn", "Bristol", "Jackson", "Marion", "Hudson", "Newport", "Oxford", "Troy", "Winchester", "Kingston",
    "Rockford", "Hamilton", "Lancaster", "Denton", "Bradford", "Charleston", "Brighton", "Canton", "Carlisle",
    "Concord", "Danville", "Easton", "Fairfax", "Galena", "Henderson", "Ipswich", "Jasper", "Keene", "Leominster",
    "Monroe", "Norwood", "Ontario", "Plainfield", "Quincy", "Raleigh", "Shelby", "Tarrytown", "Union", "Vernon",
    "Waverly", "Yorkville", "Abingdon", "Belmont", "Cambridge", "Dover", "Exeter", "Fremont", "Glenwood", "Huntington",
];

const FAKE_TLDS: &[&str] = &["com", "net", "org", "io", "co", "biz", "info", "app", "dev", "xyz", "tech", "online"];

const FAKE_DOMAIN_BASES: &[&str] = &[
    "acme", "globex", "initech", "umbrella", "stark", "wayne", "hooli", "soylent", "cyberdyne", "aperture",
    "oscorp", "wonka", "massive", "gringotts", "tyrell", "blackmesa", "orbitz", "nakatomi", "vandelay", "duff",
];

const FREE_TEXT_SHORT: &[&str] = &["lax", "zin", "vop", "kue", "mip", "tox", "wex", "aro", "nib", "dov"];
const FREE_TEXT_MEDIUM: &[&str] = &["tamber", "quorix", "bendle", "farnop", "voltik", "glimra", "hastwo", "plindor"];
const FREE_TEXT_LONG: &[&str] = &[
    "elaborandum", "transvector", "hydroplanex", "synthograph", "metacursion", "paralingual", "omnibrolic",
];

const SUFFIXES: &[&str] = &["", "ton", "ley", "son", "ette", "ina", "ric", "wyn", "dra"];

/// Expands a base word list into an array of at least `target_len` entries
/// by cycling through `(base, suffix)` pairs. Entries need not be unique.
fn expand(base: &[&str], suffixes: &[&str], target_len: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(target_len);
    let mut i = 0usize;
    while out.len() < target_len {
        let word = base[i % base.len()];
        let suffix = suffixes[(i / base.len()) % suffixes.len()];
        out.push(format!("{word}{suffix}"));
        i += 1;
    }
    out
}

/// The bundled static corpora. Built once (deterministically, no I/O) and
/// shared immutably across a run.
pub struct Corpora {
    pub first_names: Vec<String>,
    pub last_names: Vec<String>,
    pub street_types: Vec<String>,
    pub city_names: Vec<String>,
    pub fake_tlds: Vec<String>,
    pub fake_domain_bases: Vec<String>,
    pub free_text_short: Vec<String>,
    pub free_text_medium: Vec<String>,
    pub free_text_long: Vec<String>,
}

impl Default for Corpora {
    fn default() -> Self {
        Self {
            first_names: expand(BASE_FIRST_NAMES, SUFFIXES, 1000),
            last_names: expand(BASE_LAST_NAMES, SUFFIXES, 1000),
            street_types: STREET_TYPES.iter().map(|s| (*s).to_string()).collect(),
            city_names: expand(BASE_CITY_NAMES, &["", " Heights", " Falls", " Springs", " Park", " Mills", " Grove", " Crossing"], 500),
            fake_tlds: FAKE_TLDS.iter().map(|s| (*s).to_string()).collect(),
            fake_domain_bases: FAKE_DOMAIN_BASES.iter().map(|s| (*s).to_string()).collect(),
            free_text_short: FREE_TEXT_SHORT.iter().map(|s| (*s).to_string()).collect(),
            free_text_medium: FREE_TEXT_MEDIUM.iter().map(|s| (*s).to_string()).collect(),
            free_text_long: FREE_TEXT_LONG.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl Corpora {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpora_meet_minimum_sizes() {
        let c = Corpora::new();
        assert!(c.first_names.len() >= 1000);
        assert!(c.last_names.len() >= 1000);
        assert!(c.street_types.len() >= 30);
        assert!(c.city_names.len() >= 500);
        assert!(c.fake_tlds.len() >= 10);
        assert!(!c.fake_domain_bases.is_empty());
        assert!(!c.free_text_short.is_empty());
        assert!(!c.free_text_medium.is_empty());
        assert!(!c.free_text_long.is_empty());
    }

    #[test]
    fn expansion_is_deterministic() {
        let a = expand(BASE_FIRST_NAMES, SUFFIXES, 1000);
        let b = expand(BASE_FIRST_NAMES, SUFFIXES, 1000);
        assert_eq!(a, b);
    }
}
