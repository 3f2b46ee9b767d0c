//! Rule-based descriptions used when no provider produced a caption.
//!
//! Two generators: one driven by coarse hint tags (e.g. from an in-browser
//! classifier) with the filename as secondary signal, and one driven purely
//! by filename keywords.

use super::ImageAnalysis;

/// Colour words recognised among hint tags.
const TAG_COLOR_WORDS: &[&str] = &[
    "red", "blue", "green", "yellow", "orange", "purple", "pink", "brown", "black", "white",
    "gray", "grey", "silver", "gold",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Portrait,
    Automotive,
    Animal,
    Food,
    Architecture,
    Nature,
    Document,
    Art,
    Tool,
    Product,
    General,
}

struct TagSet<'a>(&'a [String]);

impl TagSet<'_> {
    fn has(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    fn has_any(&self, tags: &[&str]) -> bool {
        tags.iter().any(|t| self.has(t))
    }
}

/// Category and subject phrase from hint tags, first match wins.
fn classify_tags(tags: &TagSet<'_>) -> Option<(Category, &'static str)> {
    if tags.has_any(&["person", "man", "woman", "child", "people"]) {
        let what = if tags.has_any(&["child", "baby"]) {
            "Child or young person in portrait setting"
        } else if tags.has("man") {
            "Male subject in professional or casual portrait"
        } else if tags.has("woman") {
            "Female subject captured in portrait composition"
        } else {
            "Human subject in thoughtful portrait arrangement"
        };
        return Some((Category::Portrait, what));
    }

    if tags.has_any(&["car", "vehicle", "truck", "motorcycle", "scooter"]) {
        let what = if tags.has("car") {
            "Automobile showcasing automotive design and engineering"
        } else if tags.has_any(&["motorcycle", "scooter"]) {
            "Two-wheeled motor vehicle with dynamic presence"
        } else if tags.has("truck") {
            "Commercial or utility vehicle with robust construction"
        } else {
            "Transportation vehicle demonstrating mechanical craftsmanship"
        };
        return Some((Category::Automotive, what));
    }

    if tags.has_any(&["cat", "dog", "animal", "bird", "pet"]) {
        let what = if tags.has("cat") {
            "Feline companion displaying natural grace and character"
        } else if tags.has("dog") {
            "Canine friend showing loyalty and spirited personality"
        } else if tags.has("bird") {
            "Avian creature captured in natural or domestic setting"
        } else {
            "Animal subject expressing natural behavior and beauty"
        };
        return Some((Category::Animal, what));
    }

    if tags.has_any(&["food", "meal", "dish", "cooking"]) {
        let what = if tags.has("meal") {
            "Carefully prepared meal showcasing culinary artistry"
        } else if tags.has("dish") {
            "Gourmet dish presented with professional plating technique"
        } else {
            "Culinary creation highlighting gastronomic excellence"
        };
        return Some((Category::Food, what));
    }

    if tags.has_any(&["building", "house", "architecture", "structure"]) {
        let what = if tags.has("house") {
            "Residential architecture displaying design and livability"
        } else if tags.has("building") {
            "Architectural structure demonstrating construction and form"
        } else {
            "Built environment showcasing human design achievement"
        };
        return Some((Category::Architecture, what));
    }

    if tags.has_any(&["flower", "tree", "plant", "nature", "landscape"]) {
        let what = if tags.has("flower") {
            "Botanical bloom displaying natural beauty and delicate form"
        } else if tags.has("tree") {
            "Majestic tree representing growth and natural strength"
        } else if tags.has("landscape") {
            "Natural landscape showcasing environmental beauty"
        } else {
            "Natural element celebrating organic beauty and life"
        };
        return Some((Category::Nature, what));
    }

    if tags.has_any(&["book", "text", "document"]) {
        return Some((
            Category::Document,
            "Literary or informational content with textual elements",
        ));
    }

    if tags.has_any(&["art", "painting", "drawing"]) {
        return Some((
            Category::Art,
            "Artistic creation expressing creative vision and technique",
        ));
    }

    if tags.has_any(&["tool", "equipment", "machine"]) {
        return Some((
            Category::Tool,
            "Functional tool or equipment designed for specific purpose",
        ));
    }

    None
}

/// Category and subject from filename clues, then from the leftover tags.
fn classify_leftovers(filename: &str, tags: &[String]) -> (Category, String) {
    let name = filename.to_lowercase();

    if ["portrait", "selfie", "photo"].iter().any(|k| name.contains(k)) {
        return (
            Category::Portrait,
            "Photographic composition with human or personal elements".to_string(),
        );
    }
    if ["landscape", "scenic"].iter().any(|k| name.contains(k)) {
        return (
            Category::Nature,
            "Scenic composition capturing environmental beauty".to_string(),
        );
    }
    if ["product", "item"].iter().any(|k| name.contains(k)) {
        return (
            Category::Product,
            "Product or object presented for documentation or display".to_string(),
        );
    }

    if tags.is_empty() {
        return (
            Category::General,
            "Distinctive visual subject with unique characteristics and composition".to_string(),
        );
    }

    let meaningful = tags
        .iter()
        .find(|t| !t.contains("background") && !TAG_COLOR_WORDS.contains(&t.as_str()));
    let what = match meaningful {
        Some(subject) => format!(
            "{} captured with professional attention to detail and composition",
            capitalize(subject)
        ),
        None => format!(
            "Visual composition featuring {} elements",
            tags.iter().take(2).cloned().collect::<Vec<_>>().join(" and ")
        ),
    };
    (Category::General, what)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Per-category field texts, specialised by detected colour tags and the
/// first `"<x> background"` tag.
fn describe_category(
    category: Category,
    colors: &[&str],
    backdrop: Option<&str>,
) -> (String, String, &'static str, &'static str, &'static str) {
    let listed = |sep: &str| colors.join(sep);
    let has_colors = !colors.is_empty();

    match category {
        Category::Portrait => (
            if has_colors {
                format!("Natural skin tones with {} accents", listed(", "))
            } else {
                "Natural skin tones with complementary color palette".to_string()
            },
            match backdrop {
                Some(b) => format!("Professional {} backdrop", b),
                None => "Carefully composed portrait setting".to_string(),
            },
            "Intimate and expressive with emotional depth",
            "Captures human character and individual personality",
            "Professional portrait photography",
        ),
        Category::Automotive => (
            if has_colors {
                format!("Automotive {} with metallic finishes", listed(" and "))
            } else {
                "Metallic automotive colors with chrome accents".to_string()
            },
            match backdrop {
                Some(b) => format!("{} automotive environment", capitalize(b)),
                None => "Urban or automotive setting".to_string(),
            },
            "Dynamic energy with mechanical precision",
            "Modern transportation and engineering excellence",
            "Automotive photography",
        ),
        Category::Animal => (
            if has_colors {
                format!("Natural {} fur or feather tones", listed(" and "))
            } else {
                "Natural animal coloring with organic tones".to_string()
            },
            match backdrop {
                Some(b) => format!("{} natural environment", capitalize(b)),
                None => "Natural habitat or comfortable setting".to_string(),
            },
            "Warm, lively, and full of natural energy",
            "Natural beauty and animal character",
            "Wildlife or pet photography",
        ),
        Category::Food => (
            if has_colors {
                format!("Appetizing {} with rich culinary tones", listed(", "))
            } else {
                "Rich culinary colors with appetizing presentation".to_string()
            },
            match backdrop {
                Some(b) => format!("{} culinary setting", capitalize(b)),
                None => "Professional kitchen or dining presentation".to_string(),
            },
            "Inviting warmth with mouth-watering appeal",
            "Gastronomic artistry and culinary craftsmanship",
            "Professional food photography",
        ),
        Category::Architecture => (
            if has_colors {
                format!("Architectural {} with structural elements", listed(" and "))
            } else {
                "Architectural materials with structural color palette".to_string()
            },
            match backdrop {
                Some(b) => format!("{} urban context", capitalize(b)),
                None => "Urban or architectural environment".to_string(),
            },
            "Modern sophistication with geometric precision",
            "Human achievement in design and construction",
            "Architectural photography",
        ),
        Category::Nature => (
            if has_colors {
                format!("Natural {} with organic earth tones", listed(" and "))
            } else {
                "Natural earth tones with organic color harmony".to_string()
            },
            match backdrop {
                Some(b) => format!("{} natural setting", capitalize(b)),
                None => "Natural outdoor environment".to_string(),
            },
            "Serene tranquility with natural beauty",
            "Connection to nature and environmental harmony",
            "Nature or landscape photography",
        ),
        Category::Document => (
            if has_colors {
                format!("Text-focused {} with readable contrast", listed(" and "))
            } else {
                "High contrast colors optimized for readability".to_string()
            },
            match backdrop {
                Some(b) => format!("Clean {} document layout", b),
                None => "Professional document presentation background".to_string(),
            },
            "Informative and organized with clear communication intent",
            "Educational or informational content with structured presentation",
            "Document or informational photography",
        ),
        Category::Art => (
            if has_colors {
                format!("Artistic {} expressing creative vision", listed(", "))
            } else {
                "Rich artistic palette with expressive color relationships".to_string()
            },
            match backdrop {
                Some(b) => format!("Gallery-quality {} presentation", b),
                None => "Museum or studio setting for artistic display".to_string(),
            },
            "Creative inspiration with artistic sophistication and depth",
            "Cultural expression demonstrating human creativity and skill",
            "Fine art or creative documentation photography",
        ),
        Category::Tool => (
            if has_colors {
                format!("Functional {} emphasizing utility", listed(" and "))
            } else {
                "Practical colors highlighting functional design".to_string()
            },
            match backdrop {
                Some(b) => format!("Workshop or {} working environment", b),
                None => "Professional workspace or technical setting".to_string(),
            },
            "Purposeful and efficient with focus on functionality",
            "Human ingenuity in tool design and practical application",
            "Technical or product documentation photography",
        ),
        Category::Product => (
            if has_colors {
                format!("Commercial {} designed for market appeal", listed(", "))
            } else {
                "Market-focused colors with commercial appeal".to_string()
            },
            match backdrop {
                Some(b) => format!("Professional {} product showcase", b),
                None => "Studio lighting optimized for product presentation".to_string(),
            },
            "Polished and appealing with commercial sophistication",
            "Consumer appeal with emphasis on quality and desirability",
            "Commercial product photography",
        ),
        Category::General => (
            if has_colors {
                format!("Distinctive {} creating visual impact", listed(", "))
            } else {
                "Carefully selected color palette with intentional composition".to_string()
            },
            match backdrop {
                Some(b) => format!("Purposeful {} environmental context", b),
                None => "Thoughtfully arranged compositional environment".to_string(),
            },
            "Engaging visual presence with deliberate artistic choices",
            "Unique visual narrative demonstrating photographic skill",
            "Contemporary photography with professional composition",
        ),
    }
}

/// Category the hint tags (or, failing those, the filename) point at.
#[cfg(test)]
fn categorize(filename: &str, hint_tags: &[String]) -> Category {
    let tags: Vec<String> = hint_tags.iter().map(|t| t.to_lowercase()).collect();
    match classify_tags(&TagSet(&tags)) {
        Some((category, _)) => category,
        None => classify_leftovers(filename, &tags).0,
    }
}

/// Six fields from hint tags with the filename as secondary signal.
pub fn combined_analysis(filename: &str, hint_tags: &[String]) -> ImageAnalysis {
    let tags: Vec<String> = hint_tags.iter().map(|t| t.to_lowercase()).collect();

    let (category, what_it_is) = match classify_tags(&TagSet(&tags)) {
        Some((category, what)) => (category, what.to_string()),
        None => classify_leftovers(filename, &tags),
    };

    let colors: Vec<&str> = tags
        .iter()
        .map(String::as_str)
        .filter(|t| TAG_COLOR_WORDS.contains(t))
        .collect();
    let backdrop = tags
        .iter()
        .find(|t| t.contains("background"))
        .map(|t| t.replacen(" background", "", 1));

    let (main_colors, background, atmosphere, impression, style) =
        describe_category(category, &colors, backdrop.as_deref());

    tracing::debug!(
        "Rule-based analysis for {}: category {:?}, {} hint tags",
        filename,
        category,
        tags.len()
    );

    ImageAnalysis {
        what_it_is,
        main_colors,
        background,
        atmosphere: atmosphere.to_string(),
        impression: impression.to_string(),
        style: style.to_string(),
    }
}

struct FilenamePattern {
    keywords: &'static [&'static str],
    what_it_is: &'static str,
    main_colors: &'static str,
    background: &'static str,
    atmosphere: &'static str,
    impression: &'static str,
    style: &'static str,
}

const FILENAME_PATTERNS: &[FilenamePattern] = &[
    FilenamePattern {
        keywords: &["car", "auto", "vehicle", "truck", "motorcycle", "bike", "scooter", "wheel"],
        what_it_is: "Motor vehicle or transportation device",
        main_colors: "Metallic blues, reds, or silver with chrome accents",
        background: "Urban street, parking area, or automotive showroom",
        atmosphere: "Dynamic energy with mechanical precision",
        impression: "Modern transportation and engineering excellence",
        style: "Automotive or transportation photography",
    },
    FilenamePattern {
        keywords: &["cat", "dog", "pet", "animal", "puppy", "kitten", "bird", "horse"],
        what_it_is: "Domestic animal or wildlife creature",
        main_colors: "Natural fur tones - browns, blacks, whites, and golden hues",
        background: "Comfortable home environment or natural outdoor habitat",
        atmosphere: "Warm, affectionate, and full of life",
        impression: "Emotional connection and natural beauty of animal companionship",
        style: "Pet portrait or wildlife photography",
    },
    FilenamePattern {
        keywords: &["food", "meal", "dish", "cook", "eat", "restaurant", "kitchen", "recipe"],
        what_it_is: "Culinary creation or food presentation",
        main_colors: "Appetizing golds, rich reds, fresh greens, and warm browns",
        background: "Professional kitchen, elegant dining setting, or rustic table",
        atmosphere: "Inviting warmth with mouth-watering appeal",
        impression: "Gastronomic artistry that celebrates culinary craftsmanship",
        style: "Professional food photography or culinary documentation",
    },
    FilenamePattern {
        keywords: &["landscape", "nature", "mountain", "forest", "beach", "sunset", "tree", "flower"],
        what_it_is: "Natural landscape or botanical subject",
        main_colors: "Earth tones with vibrant greens, sky blues, and sunset oranges",
        background: "Pristine natural environment with organic elements",
        atmosphere: "Serene tranquility with breathtaking natural beauty",
        impression: "Deep connection to nature and environmental appreciation",
        style: "Landscape or nature photography",
    },
    FilenamePattern {
        keywords: &["portrait", "person", "face", "people", "human", "man", "woman", "child"],
        what_it_is: "Human subject or portrait study",
        main_colors: "Natural skin tones complemented by clothing and environmental colors",
        background: "Professional studio setup or carefully chosen environmental context",
        atmosphere: "Intimate and expressive with emotional depth",
        impression: "Captures human character, emotion, and individual personality",
        style: "Portrait photography or human documentary",
    },
    FilenamePattern {
        keywords: &["building", "architecture", "house", "city", "urban", "street", "bridge"],
        what_it_is: "Architectural structure or urban environment",
        main_colors: "Concrete grays, brick reds, glass blues, and steel metallics",
        background: "Urban cityscape or architectural setting",
        atmosphere: "Modern sophistication with geometric precision",
        impression: "Human achievement in design and urban development",
        style: "Architectural or urban photography",
    },
    FilenamePattern {
        keywords: &["art", "painting", "drawing", "sculpture", "gallery", "museum", "creative"],
        what_it_is: "Artistic creation or cultural artifact",
        main_colors: "Rich artistic palette with expressive color combinations",
        background: "Gallery space, studio environment, or cultural institution",
        atmosphere: "Creative inspiration with artistic sophistication",
        impression: "Cultural expression and human creativity",
        style: "Art documentation or cultural photography",
    },
];

const HIGH_RES_KB: f64 = 1000.0;
const WEB_SIZED_KB: f64 = 100.0;

/// Six fields from filename keywords alone, flavoured by the file size.
/// `None` when no keyword matches.
pub fn filename_analysis(filename: &str, size_bytes: Option<usize>) -> Option<ImageAnalysis> {
    let name = filename.to_lowercase();
    let pattern = FILENAME_PATTERNS
        .iter()
        .find(|p| p.keywords.iter().any(|k| name.contains(k)))?;

    let mut analysis = ImageAnalysis {
        what_it_is: pattern.what_it_is.to_string(),
        main_colors: pattern.main_colors.to_string(),
        background: pattern.background.to_string(),
        atmosphere: pattern.atmosphere.to_string(),
        impression: pattern.impression.to_string(),
        style: pattern.style.to_string(),
    };

    if let Some(size) = size_bytes {
        let size_kb = size as f64 / 1024.0;
        if size_kb > HIGH_RES_KB {
            analysis.style.push_str(" with high-resolution detail");
            analysis.impression.push_str(" captured with professional quality");
        } else if size_kb < WEB_SIZED_KB {
            analysis.style.push_str(" optimized for web presentation");
        }
    }

    Some(analysis)
}
