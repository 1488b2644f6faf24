//! Static grocery catalog.
//!
//! Products are generated in memory from literal name tables: each section
//! assigns sequential ids and derives price, unit and subcategory from the
//! product's index within the section.

use grocer_types::domain::product::{Category, NutritionInfo, Product};

struct Section {
    slug: &'static str,
    category: &'static str,
    blurb: &'static str,
    description: &'static str,
    subcategories: &'static [&'static str],
    names: &'static [&'static str],
    base_cents: i64,
    step_cents: i64,
    stock_base: u32,
    popular: usize,
    subcategory: fn(usize) -> &'static str,
    unit: fn(usize) -> &'static str,
    nutrition: Option<fn(usize) -> NutritionInfo>,
}

const SECTIONS: &[Section] = &[
    Section {
        slug: "fruits-vegetables",
        category: "Fruits & Vegetables",
        blurb: "Fresh produce from local farms",
        description: "Fresh and locally sourced produce.",
        subcategories: &["Fresh Fruits", "Fresh Vegetables", "Organic Produce", "Exotic Fruits", "Salad & Herbs"],
        names: &[
            "Organic Bananas", "Fresh Apples", "Ripe Avocados", "Sweet Oranges", "Fresh Strawberries",
            "Organic Tomatoes", "Fresh Spinach", "Organic Carrots", "Fresh Broccoli", "Sweet Potatoes",
            "Red Onions", "Fresh Mushrooms", "Organic Lettuce", "Fresh Cucumbers", "Bell Peppers",
            "Fresh Lemons", "Organic Blueberries", "Fresh Mangoes", "Organic Kale", "Fresh Zucchini",
            "Organic Potatoes", "Fresh Garlic", "Organic Ginger", "Fresh Pineapple", "Organic Celery",
        ],
        base_cents: 299,
        step_cents: 50,
        stock_base: 50,
        popular: 5,
        subcategory: |i| if i < 12 { "Fresh Fruits" } else { "Fresh Vegetables" },
        unit: |i| if i < 12 { "lb" } else { "bunch" },
        nutrition: Some(|i| NutritionInfo {
            calories: 50 + (i as u32 * 13) % 100,
            protein: 1 + (i as u32) % 5,
            carbs: 10 + (i as u32 * 7) % 20,
            fat: (i as u32) % 3,
            fiber: Some(2 + (i as u32) % 4),
        }),
    },
    Section {
        slug: "dairy-eggs",
        category: "Dairy & Eggs",
        blurb: "Fresh dairy products and eggs",
        description: "Fresh dairy products from local farms.",
        subcategories: &["Milk", "Cheese", "Yogurt", "Butter", "Eggs"],
        names: &[
            "Whole Milk", "Organic Eggs", "Cheddar Cheese", "Greek Yogurt", "Butter",
            "Almond Milk", "Cottage Cheese", "Heavy Cream", "Sour Cream", "Mozzarella",
            "Cream Cheese", "Organic Milk", "Free-Range Eggs", "Swiss Cheese", "Plain Yogurt",
            "Oat Milk", "String Cheese", "Half & Half", "Parmesan", "Gouda Cheese",
        ],
        base_cents: 349,
        step_cents: 75,
        stock_base: 30,
        popular: 4,
        subcategory: |i| if i < 10 { "Milk & Cream" } else { "Cheese" },
        unit: |i| match i {
            0..=1 => "dozen",
            2..=9 => "gallon",
            _ => "lb",
        },
        nutrition: Some(|i| NutritionInfo {
            calories: 100 + (i as u32 * 17) % 150,
            protein: 6 + (i as u32 * 3) % 8,
            carbs: 4 + (i as u32) % 6,
            fat: 6 + (i as u32 * 5) % 10,
            fiber: None,
        }),
    },
    Section {
        slug: "meat-seafood",
        category: "Meat & Seafood",
        blurb: "Quality meat and fresh seafood",
        description: "Premium quality meat and seafood.",
        subcategories: &["Chicken", "Beef", "Pork", "Fish", "Shellfish"],
        names: &[
            "Chicken Breast", "Ground Beef", "Salmon Fillet", "Pork Chops", "Shrimp",
            "Turkey", "Lamb Chops", "Tuna Steak", "Beef Steak", "Tilapia",
            "Crab Meat", "Chicken Wings", "Ground Turkey", "Cod Fillet", "Mussels",
        ],
        base_cents: 899,
        step_cents: 150,
        stock_base: 20,
        popular: 3,
        subcategory: |i| if i < 8 { "Meat" } else { "Seafood" },
        unit: |_| "lb",
        nutrition: None,
    },
    Section {
        slug: "bakery",
        category: "Bakery",
        blurb: "Fresh baked goods daily",
        description: "Freshly baked goods.",
        subcategories: &["Bread", "Pastries", "Cakes", "Cookies", "Baking Supplies"],
        names: &[
            "Sourdough Bread", "Croissants", "Chocolate Cake", "Baguette", "Muffins",
            "Bagels", "Danish Pastry", "Whole Wheat Bread", "Cookies", "Cinnamon Rolls",
            "Rye Bread", "Cupcakes", "Donuts", "Pie", "Brownies",
        ],
        base_cents: 399,
        step_cents: 80,
        stock_base: 40,
        popular: 4,
        subcategory: |i| if i < 8 { "Bread" } else { "Pastries" },
        unit: |_| "piece",
        nutrition: None,
    },
    Section {
        slug: "pantry",
        category: "Pantry",
        blurb: "Essential grocery items",
        description: "Essential pantry items.",
        subcategories: &["Rice & Grains", "Pasta", "Canned Goods", "Condiments", "Spices"],
        names: &[
            "Rice", "Pasta", "Olive Oil", "Tomato Sauce", "Black Beans",
            "Cereal", "Peanut Butter", "Tuna Cans", "Soup", "Flour",
            "Sugar", "Salt", "Pepper", "Coffee Beans", "Tea Bags",
        ],
        base_cents: 499,
        step_cents: 60,
        stock_base: 60,
        popular: 3,
        subcategory: |_| "Essentials",
        unit: |i| if i < 5 { "lb" } else { "pack" },
        nutrition: None,
    },
    Section {
        slug: "beverages",
        category: "Beverages",
        blurb: "Refreshing drinks and more",
        description: "Refreshing beverages.",
        subcategories: &["Water", "Soft Drinks", "Coffee", "Tea", "Juices"],
        names: &[
            "Bottled Water", "Cola", "Orange Juice", "Coffee", "Green Tea",
            "Sparkling Water", "Energy Drink", "Apple Juice", "Iced Tea", "Lemonade",
        ],
        base_cents: 299,
        step_cents: 70,
        stock_base: 70,
        popular: 3,
        subcategory: |i| if i < 5 { "Cold Drinks" } else { "Hot Drinks" },
        unit: |_| "bottle",
        nutrition: None,
    },
    Section {
        slug: "snacks",
        category: "Snacks",
        blurb: "Delicious treats and snacks",
        description: "Delicious snacks.",
        subcategories: &["Chips", "Nuts", "Crackers", "Chocolates", "Candies"],
        names: &[
            "Potato Chips", "Mixed Nuts", "Popcorn", "Chocolate Bar", "Crackers",
            "Trail Mix", "Pretzels", "Candy", "Granola Bars", "Rice Cakes",
        ],
        base_cents: 349,
        step_cents: 50,
        stock_base: 80,
        popular: 3,
        subcategory: |i| if i < 5 { "Salty" } else { "Sweet" },
        unit: |_| "pack",
        nutrition: None,
    },
    Section {
        slug: "household",
        category: "Household",
        blurb: "Home and cleaning essentials",
        description: "Essential household items.",
        subcategories: &["Cleaning", "Paper Goods", "Laundry", "Kitchen Supplies", "Pet Supplies"],
        names: &[
            "Paper Towels", "Dish Soap", "Laundry Detergent", "Trash Bags", "Cleaning Spray",
            "Sponges", "Toilet Paper", "Air Freshener", "Hand Soap", "Tissues",
        ],
        base_cents: 599,
        step_cents: 90,
        stock_base: 90,
        popular: 3,
        subcategory: |_| "Cleaning",
        unit: |_| "pack",
        nutrition: None,
    },
];

#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(categories: Vec<Category>, products: Vec<Product>) -> Self {
        Self {
            categories,
            products,
        }
    }

    /// The storefront's grocery assortment.
    pub fn grocery() -> Self {
        let mut categories = Vec::with_capacity(SECTIONS.len());
        let mut products = Vec::new();
        for section in SECTIONS {
            categories.push(Category {
                slug: section.slug.into(),
                name: section.category.into(),
                description: section.blurb.into(),
                image: format!("/categories/{}.jpg", section.slug),
                subcategories: section.subcategories.iter().map(|s| s.to_string()).collect(),
            });
            for (i, name) in section.names.iter().enumerate() {
                let offset = i64::try_from(i).unwrap_or(i64::MAX);
                products.push(Product {
                    id: (products.len() + 1).to_string(),
                    name: name.to_string(),
                    description: section.description.into(),
                    price_cents: section.base_cents + offset * section.step_cents,
                    image: format!("/products/{}-{}.jpg", section.slug, i % 5 + 1),
                    category: section.category.into(),
                    subcategory: (section.subcategory)(i).into(),
                    unit: (section.unit)(i).into(),
                    stock: section.stock_base + (i as u32 * 7) % 30,
                    is_popular: i < section.popular,
                    nutrition: section.nutrition.map(|f| f(i)),
                });
            }
        }
        Self::new(categories, products)
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn all(&self) -> &[Product] {
        &self.products
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn by_category(&self, slug: &str) -> Vec<&Product> {
        let Some(category) = self.categories.iter().find(|c| c.slug == slug) else {
            return Vec::new();
        };
        self.products
            .iter()
            .filter(|p| p.category == category.name)
            .collect()
    }

    pub fn popular(&self) -> Vec<&Product> {
        self.products.iter().filter(|p| p.is_popular).collect()
    }

    /// Other products from the same category, in catalog order.
    pub fn related(&self, id: &str, limit: usize) -> Vec<&Product> {
        let Some(product) = self.get(id) else {
            return Vec::new();
        };
        self.products
            .iter()
            .filter(|p| p.category == product.category && p.id != product.id)
            .take(limit)
            .collect()
    }

    /// Case-insensitive match of every whitespace-separated term against
    /// name, description, category and subcategory. Products whose name
    /// contains the whole query come first.
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let terms: Vec<&str> = query.split_whitespace().collect();
        let mut hits: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| {
                let text = format!(
                    "{} {} {} {}",
                    p.name, p.description, p.category, p.subcategory
                )
                .to_lowercase();
                terms.iter().all(|t| text.contains(t))
            })
            .collect();
        hits.sort_by_key(|p| !p.name.to_lowercase().contains(&query));
        hits
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::grocery()
    }
}
