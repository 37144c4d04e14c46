//! Application constants for annotator output extraction
//!
//! Record tags and field layout of the MetaMapLite MMI format, the location-kind
//! tokens recognised in trigger info, output column ordering, and the static UMLS
//! semantic type tables.

// =============================================================================
// MMI Record Layout
// =============================================================================

/// Outer field delimiter of MMI records
pub const MMI_DELIMITER: char = '|';

/// Record tag identifying a concept-mention line
pub const MMI_RECORD_TAG: &str = "MMI";

/// Record tags for abbreviation/acronym annotations, skipped silently
pub const ABBREVIATION_TAGS: &[&str] = &["AA", "UA"];

/// Minimum number of fields in a complete MMI record
pub const MMI_MIN_FIELDS: usize = 10;

/// Fixed width of abbreviation records
pub const ABBREVIATION_FIELDS: usize = 9;

/// Zero-indexed positions of the fields within an MMI record
pub mod mmi_fields {
    pub const IDENTIFIER: usize = 0;
    pub const RECORD_TAG: usize = 1;
    pub const SCORE: usize = 2;
    pub const CONCEPT_STRING: usize = 3;
    pub const CUI: usize = 4;
    pub const SEMANTIC_TYPES: usize = 5;
    pub const TRIGGER_INFO: usize = 6;
    pub const LOCATION: usize = 7;
    pub const POSITIONAL_INFO: usize = 8;
    pub const TREE_CODES: usize = 9;
}

/// Location kinds that may follow the concept name in trigger info, as the
/// three-character prefix seen after the `-` separator
pub const LOCATION_KIND_PREFIXES: &[&str] = &["tex", "ti-", "ab-", "tx-"];

// =============================================================================
// Output Columns
// =============================================================================

/// Columns always written first, in this order; dynamic keys follow sorted
pub const LEADING_COLUMNS: &[&str] = &[
    "event_id",
    "docid",
    "filename",
    "matchedtext",
    "conceptstring",
    "cui",
    "preferredname",
    "start",
    "end",
    "length",
    "evid",
    "negated",
    "pos",
    "semantictype",
    "all_semantictypes",
    "source",
    "all_sources",
];

/// Columns of the note statistics table
pub const NOTE_COLUMNS: &[&str] = &[
    "filename",
    "docid",
    "num_chars",
    "num_letters",
    "num_words",
    "processed",
];

// =============================================================================
// Offset Recovery
// =============================================================================

/// Window radii searched around a claimed span, in characters
pub const LOCATE_WINDOWS: &[usize] = &[50, 100];

// =============================================================================
// UMLS Semantic Types
// =============================================================================

/// TUI to semantic type abbreviation (UMLS 2018AB), sorted by TUI
pub const TUI_TO_SEMANTIC_TYPE: &[(&str, &str)] = &[
    ("T001", "orgm"),
    ("T002", "plnt"),
    ("T004", "fngs"),
    ("T005", "virs"),
    ("T007", "bact"),
    ("T008", "anim"),
    ("T010", "vtbt"),
    ("T011", "amph"),
    ("T012", "bird"),
    ("T013", "fish"),
    ("T014", "rept"),
    ("T015", "mamm"),
    ("T016", "humn"),
    ("T017", "anst"),
    ("T018", "emst"),
    ("T019", "cgab"),
    ("T020", "acab"),
    ("T021", "ffas"),
    ("T022", "bdsy"),
    ("T023", "bpoc"),
    ("T024", "tisu"),
    ("T025", "cell"),
    ("T026", "celc"),
    ("T028", "gngm"),
    ("T029", "blor"),
    ("T030", "bsoj"),
    ("T031", "bdsu"),
    ("T032", "orga"),
    ("T033", "fndg"),
    ("T034", "lbtr"),
    ("T037", "inpo"),
    ("T038", "biof"),
    ("T039", "phsf"),
    ("T040", "orgf"),
    ("T041", "menp"),
    ("T042", "ortf"),
    ("T043", "celf"),
    ("T044", "moft"),
    ("T045", "genf"),
    ("T046", "patf"),
    ("T047", "dsyn"),
    ("T048", "mobd"),
    ("T049", "comd"),
    ("T050", "emod"),
    ("T051", "evnt"),
    ("T052", "acty"),
    ("T053", "bhvr"),
    ("T054", "socb"),
    ("T055", "inbe"),
    ("T056", "dora"),
    ("T057", "ocac"),
    ("T058", "hlca"),
    ("T059", "lbpr"),
    ("T060", "diap"),
    ("T061", "topp"),
    ("T062", "resa"),
    ("T063", "mbrt"),
    ("T064", "gora"),
    ("T065", "edac"),
    ("T066", "mcha"),
    ("T067", "phpr"),
    ("T068", "hcpp"),
    ("T069", "eehu"),
    ("T070", "npop"),
    ("T071", "enty"),
    ("T072", "phob"),
    ("T073", "mnob"),
    ("T074", "medd"),
    ("T075", "resd"),
    ("T077", "cnce"),
    ("T078", "idcn"),
    ("T079", "tmco"),
    ("T080", "qlco"),
    ("T081", "qnco"),
    ("T082", "spco"),
    ("T083", "geoa"),
    ("T085", "mosq"),
    ("T086", "nusq"),
    ("T087", "amas"),
    ("T088", "crbs"),
    ("T089", "rnlw"),
    ("T090", "ocdi"),
    ("T091", "bmod"),
    ("T092", "orgt"),
    ("T093", "hcro"),
    ("T094", "pros"),
    ("T095", "shro"),
    ("T096", "grup"),
    ("T097", "prog"),
    ("T098", "popg"),
    ("T099", "famg"),
    ("T100", "aggp"),
    ("T101", "podg"),
    ("T102", "grpa"),
    ("T103", "chem"),
    ("T104", "chvs"),
    ("T109", "orch"),
    ("T114", "nnon"),
    ("T116", "aapp"),
    ("T120", "chvf"),
    ("T121", "phsu"),
    ("T122", "bodm"),
    ("T123", "bacs"),
    ("T125", "horm"),
    ("T126", "enzy"),
    ("T127", "vita"),
    ("T129", "imft"),
    ("T130", "irda"),
    ("T131", "hops"),
    ("T167", "sbst"),
    ("T168", "food"),
    ("T169", "ftcn"),
    ("T170", "inpr"),
    ("T171", "lang"),
    ("T184", "sosy"),
    ("T185", "clas"),
    ("T190", "anab"),
    ("T191", "neop"),
    ("T192", "rcpt"),
    ("T194", "arch"),
    ("T195", "antb"),
    ("T196", "elii"),
    ("T197", "inch"),
    ("T200", "clnd"),
    ("T201", "clna"),
    ("T203", "drdd"),
    ("T204", "euka"),
];

/// Semantic type abbreviation to full name, sorted by abbreviation
pub const SEMANTIC_TYPE_NAMES: &[(&str, &str)] = &[
    ("aapp", "Amino Acid, Peptide, or Protein"),
    ("acab", "Acquired Abnormality"),
    ("acty", "Activity"),
    ("aggp", "Age Group"),
    ("amas", "Amino Acid Sequence"),
    ("amph", "Amphibian"),
    ("anab", "Anatomical Abnormality"),
    ("anim", "Animal"),
    ("anst", "Anatomical Structure"),
    ("antb", "Antibiotic"),
    ("arch", "Archaeon"),
    ("bacs", "Biologically Active Substance"),
    ("bact", "Bacterium"),
    ("bdsu", "Body Substance"),
    ("bdsy", "Body System"),
    ("bhvr", "Behavior"),
    ("biof", "Biologic Function"),
    ("bird", "Bird"),
    ("blor", "Body Location or Region"),
    ("bmod", "Biomedical Occupation or Discipline"),
    ("bodm", "Biomedical or Dental Material"),
    ("bpoc", "Body Part, Organ, or Organ Component"),
    ("bsoj", "Body Space or Junction"),
    ("celc", "Cell Component"),
    ("celf", "Cell Function"),
    ("cell", "Cell"),
    ("cgab", "Congenital Abnormality"),
    ("chem", "Chemical"),
    ("chvf", "Chemical Viewed Functionally"),
    ("chvs", "Chemical Viewed Structurally"),
    ("clas", "Classification"),
    ("clna", "Clinical Attribute"),
    ("clnd", "Clinical Drug"),
    ("cnce", "Conceptual Entity"),
    ("comd", "Cell or Molecular Dysfunction"),
    ("crbs", "Carbohydrate Sequence"),
    ("diap", "Diagnostic Procedure"),
    ("dora", "Daily or Recreational Activity"),
    ("drdd", "Drug Delivery Device"),
    ("dsyn", "Disease or Syndrome"),
    ("edac", "Educational Activity"),
    ("eehu", "Environmental Effect of Humans"),
    ("elii", "Element, Ion, or Isotope"),
    ("emod", "Experimental Model of Disease"),
    ("emst", "Embryonic Structure"),
    ("enty", "Entity"),
    ("enzy", "Enzyme"),
    ("euka", "Eukaryote"),
    ("evnt", "Event"),
    ("famg", "Family Group"),
    ("ffas", "Fully Formed Anatomical Structure"),
    ("fish", "Fish"),
    ("fndg", "Finding"),
    ("fngs", "Fungus"),
    ("food", "Food"),
    ("ftcn", "Functional Concept"),
    ("genf", "Genetic Function"),
    ("geoa", "Geographic Area"),
    ("gngm", "Gene or Genome"),
    ("gora", "Governmental or Regulatory Activity"),
    ("grpa", "Group Attribute"),
    ("grup", "Group"),
    ("hcpp", "Human-caused Phenomenon or Process"),
    ("hcro", "Health Care Related Organization"),
    ("hlca", "Health Care Activity"),
    ("hops", "Hazardous or Poisonous Substance"),
    ("horm", "Hormone"),
    ("humn", "Human"),
    ("idcn", "Idea or Concept"),
    ("imft", "Immunologic Factor"),
    ("inbe", "Individual Behavior"),
    ("inch", "Inorganic Chemical"),
    ("inpo", "Injury or Poisoning"),
    ("inpr", "Intellectual Product"),
    ("irda", "Indicator, Reagent, or Diagnostic Aid"),
    ("lang", "Language"),
    ("lbpr", "Laboratory Procedure"),
    ("lbtr", "Laboratory or Test Result"),
    ("mamm", "Mammal"),
    ("mbrt", "Molecular Biology Research Technique"),
    ("mcha", "Machine Activity"),
    ("medd", "Medical Device"),
    ("menp", "Mental Process"),
    ("mnob", "Manufactured Object"),
    ("mobd", "Mental or Behavioral Dysfunction"),
    ("moft", "Molecular Function"),
    ("mosq", "Molecular Sequence"),
    ("neop", "Neoplastic Process"),
    ("nnon", "Nucleic Acid, Nucleoside, or Nucleotide"),
    ("npop", "Natural Phenomenon or Process"),
    ("nusq", "Nucleotide Sequence"),
    ("ocac", "Occupational Activity"),
    ("ocdi", "Occupation or Discipline"),
    ("orch", "Organic Chemical"),
    ("orga", "Organism Attribute"),
    ("orgf", "Organism Function"),
    ("orgm", "Organism"),
    ("orgt", "Organization"),
    ("ortf", "Organ or Tissue Function"),
    ("patf", "Pathologic Function"),
    ("phob", "Physical Object"),
    ("phpr", "Phenomenon or Process"),
    ("phsf", "Physiologic Function"),
    ("phsu", "Pharmacologic Substance"),
    ("plnt", "Plant"),
    ("podg", "Patient or Disabled Group"),
    ("popg", "Population Group"),
    ("prog", "Professional or Occupational Group"),
    ("pros", "Professional Society"),
    ("qlco", "Qualitative Concept"),
    ("qnco", "Quantitative Concept"),
    ("rcpt", "Receptor"),
    ("rept", "Reptile"),
    ("resa", "Research Activity"),
    ("resd", "Research Device"),
    ("rnlw", "Regulation or Law"),
    ("sbst", "Substance"),
    ("shro", "Self-help or Relief Organization"),
    ("socb", "Social Behavior"),
    ("sosy", "Sign or Symptom"),
    ("spco", "Spatial Concept"),
    ("tisu", "Tissue"),
    ("tmco", "Temporal Concept"),
    ("topp", "Therapeutic or Preventive Procedure"),
    ("virs", "Virus"),
    ("vita", "Vitamin"),
    ("vtbt", "Vertebrate"),
];

/// Translate a TUI (e.g. `T184`) to its semantic type abbreviation (e.g. `sosy`)
pub fn semantic_type_for_tui(tui: &str) -> Option<&'static str> {
    TUI_TO_SEMANTIC_TYPE
        .binary_search_by(|(key, _)| (*key).cmp(tui))
        .ok()
        .map(|idx| TUI_TO_SEMANTIC_TYPE[idx].1)
}

/// Full name of a semantic type abbreviation
pub fn semantic_type_name(abbreviation: &str) -> Option<&'static str> {
    SEMANTIC_TYPE_NAMES
        .binary_search_by(|(key, _)| (*key).cmp(abbreviation))
        .ok()
        .map(|idx| SEMANTIC_TYPE_NAMES[idx].1)
}
