//! Localized terminal strings and product card rendering.

use pharmabot_core::Language;
use pharmabot_core::product::ProductRecord;

/// Fixed UI text for one language.
pub struct UiText {
    pub title: &'static str,
    pub prompt: &'static str,
    pub you: &'static str,
    pub assistant: &'static str,
    pub recommended: &'static str,
    pub price: &'static str,
    pub image: &'static str,
    pub buy: &'static str,
    pub goodbye: &'static str,
    pub hint: &'static str,
}

const ENGLISH: UiText = UiText {
    title: "Family Pharmacy AI",
    prompt: "How can I help you today?",
    you: "You",
    assistant: "Pharmacist",
    recommended: "Recommended Products",
    price: "Price",
    image: "Image",
    buy: "Buy",
    goodbye: "Goodbye! Stay healthy.",
    hint: "Type 'exit' to quit, '/lang ar' to switch to Arabic, '/clear' to start over.",
};

const ARABIC: UiText = UiText {
    title: "صيدلية العائلة",
    prompt: "كيف يمكنني مساعدتك اليوم؟",
    you: "أنت",
    assistant: "الصيدلي",
    recommended: "المنتجات الموصى بها",
    price: "السعر",
    image: "الصورة",
    buy: "شراء",
    goodbye: "مع السلامة! دمت بصحة جيدة.",
    hint: "اكتب 'خروج' للإنهاء، '/lang en' للإنجليزية، '/clear' للبدء من جديد.",
};

pub fn text(language: Language) -> &'static UiText {
    match language {
        Language::English => &ENGLISH,
        Language::Arabic => &ARABIC,
    }
}

/// One card per product: name, then price, image and link when present.
pub fn product_cards(products: &[ProductRecord], language: Language) -> String {
    if products.is_empty() {
        return String::new();
    }

    let ui = text(language);
    let mut out = format!("  ── {} ──\n", ui.recommended);
    for (i, product) in products.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, product.name()));
        if let Some(price) = product.price() {
            out.push_str(&format!("     {}: {price}\n", ui.price));
        }
        if let Some(image) = product.image() {
            out.push_str(&format!("     {}: {image}\n", ui.image));
        }
        if let Some(link) = product.link() {
            out.push_str(&format!("     {}: {link}\n", ui.buy));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_follow_language() {
        assert_eq!(text(Language::English).recommended, "Recommended Products");
        assert_eq!(text(Language::Arabic).recommended, "المنتجات الموصى بها");
    }

    #[test]
    fn cards_show_available_fields() {
        let product = ProductRecord::from_value(serde_json::json!({
            "item_name": "Panadol Advance",
            "price": "12.50",
            "productlink": "https://example.com/panadol",
        }))
        .unwrap();

        let cards = product_cards(&[product], Language::English);
        assert!(cards.contains("Recommended Products"));
        assert!(cards.contains("1. Panadol Advance"));
        assert!(cards.contains("Price: 12.50"));
        assert!(cards.contains("Buy: https://example.com/panadol"));
        assert!(!cards.contains("Image:"));
    }

    #[test]
    fn no_products_no_cards() {
        assert!(product_cards(&[], Language::Arabic).is_empty());
    }
}
