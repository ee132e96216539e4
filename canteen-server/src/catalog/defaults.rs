//! 静态菜单目录
//!
//! 本地模式下的基础菜单，远程模式下 `menu` 集合为空时的种子数据。

use std::sync::LazyLock;

use shared::models::MenuItem;

/// Compile-time catalog row
struct StaticItem {
    category_id: &'static str,
    category: &'static str,
    id: &'static str,
    name: &'static str,
    price: u32,
    tagline: &'static str,
    image_name: &'static str,
    flags: &'static [&'static str],
}

impl StaticItem {
    #[allow(clippy::too_many_arguments)]
    const fn new(
        category_id: &'static str,
        category: &'static str,
        id: &'static str,
        name: &'static str,
        price: u32,
        tagline: &'static str,
        image_name: &'static str,
        flags: &'static [&'static str],
    ) -> Self {
        Self {
            category_id,
            category,
            id,
            name,
            price,
            tagline,
            image_name,
            flags,
        }
    }

    fn to_item(&self) -> MenuItem {
        MenuItem {
            id: self.id.to_string(),
            name: self.name.to_string(),
            category_id: self.category_id.to_string(),
            category: self.category.to_string(),
            price: self.price,
            tagline: self.tagline.to_string(),
            image_name: self.image_name.to_string(),
            flags: self.flags.iter().map(|f| f.to_string()).collect(),
            veg: true,
            available: true,
            sort_order: 0,
        }
    }
}

#[rustfmt::skip]
const STATIC_ITEMS: &[StaticItem] = &[
    StaticItem::new("breakfast", "Breakfast", "uppit", "Uppit (Upma)", 20, "Morning algorithm starter", "uppit.jpg", &["Quick (5 mins)"]),
    StaticItem::new("breakfast", "Breakfast", "avalakki", "Avalakki (Poha)", 30, "Lightweight breakfast, heavy performance", "poha.jpg", &[]),
    StaticItem::new("breakfast", "Breakfast", "puri", "Puri", 45, "Fluffy circles of happiness", "puri.jpg", &[]),
    StaticItem::new("breakfast", "Breakfast", "puri-single", "Puri (Single)", 35, "Single plate option", "puri.jpg", &[]),
    StaticItem::new("breakfast", "Breakfast", "idli-wada", "Idli Wada", 40, "Soft idli with crisp wada", "idli-wada.jpg", &[]),
    StaticItem::new("breakfast", "Breakfast", "masala-dosa", "Masala Dosa", 50, "South India crispy legacy", "masala-dosa.jpg", &["Bestseller"]),
    StaticItem::new("breakfast", "Breakfast", "plain-dosa", "Plain Dosa", 40, "Simple, classic, perfect", "plain-dosa.jpg", &[]),
    StaticItem::new("breakfast", "Breakfast", "uttappa", "Uttappa", 60, "Thick and fluffy comfort", "uttappa.jpg", &[]),
    StaticItem::new("breakfast", "Breakfast", "set-dosa", "Set Dosa", 60, "Triple the joy", "set-dosa.jpg", &["Today Special"]),
    StaticItem::new("breakfast", "Breakfast", "palau", "Palau (Pulao)", 40, "One-pot wonder", "pulao.jpg", &[]),
    StaticItem::new("breakfast", "Breakfast", "kushka", "Kushka", 60, "Hyderabadi soul food", "kushka.avif", &[]),
    StaticItem::new("lunch", "Lunch", "chapati-uta", "Chapati Uta (Set)", 80, "Homestyle thali vibes", "chapati-uta.jpg", &["Bestseller"]),
    StaticItem::new("lunch", "Lunch", "puri-uta", "Puri Uta (Set)", 80, "Festival on a plate", "puri-uta.jpg", &[]),
    StaticItem::new("lunch", "Lunch", "menthe-chapatpi-uta", "Menthe Chapatpi Uta", 100, "Fenugreek fresh feast", "menthe-chapati-uta.png", &[]),
    StaticItem::new("rice", "Rice Items", "jeera-rice", "Jeera Rice", 70, "Cumin-kissed comfort", "jeera-rice.jpg", &[]),
    StaticItem::new("rice", "Rice Items", "veg-fried-rice", "Veg Fried Rice", 70, "Wok-tossed happiness", "veg-fried-rice.jpg", &[]),
    StaticItem::new("rice", "Rice Items", "ghee-rice", "Ghee Rice", 90, "Golden richness in every grain", "ghee-rice.jpg", &["Today Special"]),
    StaticItem::new("rice", "Rice Items", "lemon-rice", "Lemon Rice", 70, "Tangy South Indian classic", "lemon-rice.jpg", &[]),
    StaticItem::new("rice", "Rice Items", "masala-rice", "Masala Rice", 70, "Spice-infused comfort", "masala-rice.jpg", &[]),
    StaticItem::new("rice", "Rice Items", "puliyogare", "Puliyogare (Tamarind Rice)", 70, "Temple prasad at your table", "puliyogare.jpg", &[]),
    StaticItem::new("rice", "Rice Items", "gobi-rice", "Gobi Rice", 90, "Cauliflower power bowl", "gobi-rice.png", &[]),
    StaticItem::new("snacks", "Snacks", "gobi-dry", "Gobi (Manchurian/Dry)", 70, "Crispy cauliflower bites", "gobi-dry.jpg", &["Bestseller"]),
    StaticItem::new("snacks", "Snacks", "french-fries", "French Fries", 60, "Potato sticks of joy", "french-fries.jpg", &["Quick (5 mins)"]),
    StaticItem::new("snacks", "Snacks", "sabudana-vada", "Sabudana Vada", 40, "Fast-friendly crunch", "sabudana-vada.jpg", &[]),
    StaticItem::new("snacks", "Snacks", "vada-pav", "Vada Pav", 20, "Mumbai heartbeat", "vada-pav.jpg", &["Bestseller", "Quick (5 mins)"]),
    StaticItem::new("snacks", "Snacks", "maskabun", "Maskabun (Butter Bun)", 20, "College nostalgia", "muska-bun.jpg", &[]),
    StaticItem::new("snacks", "Snacks", "chocolate", "Chocolate", 30, "Sweet mood fixer", "choclate-bun.jpg", &["Quick (5 mins)"]),
    StaticItem::new("snacks", "Snacks", "nuggets", "Nuggets", 45, "Bite-sized happiness", "nuggets.jpg", &[]),
    StaticItem::new("snacks", "Snacks", "corn-stick", "Corn Stick", 45, "Crunchy corn delight", "sticks.jpg", &[]),
    StaticItem::new("beverages", "Beverages", "tea", "Tea", 10, "Hostel survival fuel", "tea.jpg", &["Quick (5 mins)"]),
    StaticItem::new("beverages", "Beverages", "coffee", "Coffee", 15, "Debug your drowsiness", "coffee.jpg", &["Bestseller", "Quick (5 mins)"]),
    StaticItem::new("beverages", "Beverages", "bournvita", "Bournvita", 15, "Childhood in a cup", "bournvita.png", &[]),
    StaticItem::new("beverages", "Beverages", "boost", "Boost", 15, "Energy for engineers", "boost.png", &[]),
    StaticItem::new("beverages", "Beverages", "milk", "Milk", 20, "Pure calcium power", "milk.jpg", &[]),
    StaticItem::new("milkshakes", "Milkshakes", "strawberry-shake", "Strawberry", 60, "Berry blast refresh", "strawberry-shake.jpg", &[]),
    StaticItem::new("milkshakes", "Milkshakes", "banana-shake", "Banana Shake", 60, "Potassium power-up", "banana-shake.jpg", &[]),
    StaticItem::new("milkshakes", "Milkshakes", "cold-coffee", "Cold Coffee", 60, "Caffeine cooler", "cold-coffee.jpg", &["Bestseller"]),
    StaticItem::new("milkshakes", "Milkshakes", "oreo-shake", "Oreo", 60, "Cookie chaos in a glass", "oreo-shake.jpg", &[]),
    StaticItem::new("milkshakes", "Milkshakes", "kitkat-shake", "KitKat", 60, "Break time essential", "kitkat-shake.jpg", &[]),
    StaticItem::new("juices", "Juices", "watermelon-juice", "Watermelon", 50, "Summer hydration hero", "watermelon-juice.jpg", &[]),
    StaticItem::new("juices", "Juices", "pineapple-juice", "Pineapple", 50, "Tropical tang", "pineapple-juice.jpg", &[]),
    StaticItem::new("juices", "Juices", "chickoo-juice", "Chickoo", 50, "Sapota sweetness", "chickoo-juice.jpg", &[]),
    StaticItem::new("juices", "Juices", "orange-juice", "Orange", 50, "Vitamin C boost", "orange-juice.jpg", &[]),
    StaticItem::new("juices", "Juices", "apple-juice", "Apple", 50, "Keep doctor away", "apple-juice.jpg", &[]),
    StaticItem::new("juices", "Juices", "karbuj-juice", "Karbuj (Musk Melon)", 50, "Melon madness", "karbuj-juice.jpg", &[]),
    StaticItem::new("juices", "Juices", "papaya-juice", "Papaya", 50, "Digestive delight", "papaya-juice.jpg", &[]),
    StaticItem::new("extras", "Extras", "fruit-salad", "Fruit Salad", 40, "Freshness bowl", "fruit-salad.jpg", &[]),
];

static CATALOG: LazyLock<Vec<MenuItem>> = LazyLock::new(|| {
    let mut items: Vec<MenuItem> = STATIC_ITEMS.iter().map(StaticItem::to_item).collect();
    items.sort_by(MenuItem::catalog_order);
    items
});

/// Static catalog in catalog order
pub fn static_catalog() -> &'static [MenuItem] {
    &CATALOG
}

/// Look up one static item by id
pub fn static_item(id: &str) -> Option<&'static MenuItem> {
    CATALOG.iter().find(|item| item.id == id)
}

/// Seed documents for an empty `menu` collection.
///
/// `sortOrder` defaults to the 1-based position in catalog order.
pub fn seed_items() -> Vec<MenuItem> {
    CATALOG.iter().enumerate().map(|(index, item)| seeded(index, item)).collect()
}

/// One item exactly as [`seed_items`] writes it
pub fn seeded_item(id: &str) -> Option<MenuItem> {
    CATALOG
        .iter()
        .position(|item| item.id == id)
        .map(|index| seeded(index, &CATALOG[index]))
}

fn seeded(index: usize, item: &MenuItem) -> MenuItem {
    let mut item = item.clone();
    if item.sort_order == 0 {
        item.sort_order = index as i64 + 1;
    }
    item
}
