//! Static content shown when the content API is unreachable

use spacetechs_shared::{Blog, Category, CategoryRef, Project};

fn category_ref(id: &str, name: &str) -> Option<CategoryRef> {
    Some(CategoryRef {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        slug: None,
    })
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn fallback_projects() -> Vec<Project> {
    vec![
        Project {
            id: "1".to_string(),
            slug: Some("ai-dashboard".to_string()),
            title: Some("AI Dashboard".to_string()),
            description: Some(
                "Advanced machine learning analytics platform with real-time data visualization and predictive modeling capabilities."
                    .to_string(),
            ),
            category: category_ref("1", "Artificial Intelligence"),
            technologies: strings(&["React", "Python", "TensorFlow", "MongoDB"]),
            status: Some("Completed".to_string()),
            featured: true,
            images: strings(&[
                "https://images.unsplash.com/photo-1551288049-bebda4e38f71?w=600&h=400&fit=crop",
            ]),
            github_url: Some("https://github.com/example/ai-dashboard".to_string()),
            live_demo_url: Some("https://ai-dashboard-demo.vercel.app".to_string()),
            start_date: Some("2024-01-15".to_string()),
            end_date: Some("2024-06-30".to_string()),
            created_at: Some("2024-01-15T00:00:00.000Z".to_string()),
            ..Project::default()
        },
        Project {
            id: "2".to_string(),
            slug: Some("ecommerce-platform".to_string()),
            title: Some("E-Commerce Platform".to_string()),
            description: Some(
                "Full-stack e-commerce solution with payment integration, inventory management, and admin dashboard."
                    .to_string(),
            ),
            category: category_ref("2", "Web Development"),
            technologies: strings(&["Next.js", "Node.js", "PostgreSQL", "Stripe"]),
            status: Some("Ongoing".to_string()),
            featured: true,
            images: strings(&[
                "https://images.unsplash.com/photo-1556742049-0cfed4f6a45d?w=600&h=400&fit=crop",
            ]),
            github_url: Some("https://github.com/example/ecommerce".to_string()),
            start_date: Some("2024-03-01".to_string()),
            created_at: Some("2024-03-01T00:00:00.000Z".to_string()),
            ..Project::default()
        },
        Project {
            id: "3".to_string(),
            slug: Some("mobile-banking-app".to_string()),
            title: Some("Mobile Banking App".to_string()),
            description: Some(
                "Secure mobile banking application with biometric authentication and real-time transaction monitoring."
                    .to_string(),
            ),
            category: category_ref("3", "Mobile Development"),
            technologies: strings(&["React Native", "Firebase", "Node.js", "JWT"]),
            status: Some("Completed".to_string()),
            featured: false,
            images: strings(&[
                "https://images.unsplash.com/photo-1563013544-824ae1b704d3?w=600&h=400&fit=crop",
            ]),
            client: Some("FinTech Corp".to_string()),
            start_date: Some("2023-09-01".to_string()),
            end_date: Some("2024-02-15".to_string()),
            created_at: Some("2023-09-01T00:00:00.000Z".to_string()),
            ..Project::default()
        },
    ]
}

pub fn fallback_featured_projects() -> Vec<Project> {
    fallback_projects().into_iter().filter(|p| p.featured).collect()
}

pub fn fallback_categories() -> Vec<Category> {
    [
        ("1", "Artificial Intelligence", "ai"),
        ("2", "Web Development", "web-dev"),
        ("3", "Mobile Development", "mobile-dev"),
    ]
    .into_iter()
    .map(|(id, name, slug)| Category {
        id: id.to_string(),
        name: name.to_string(),
        slug: Some(slug.to_string()),
        description: None,
    })
    .collect()
}

/// Featured blogs have no static stand-in
pub fn fallback_blogs() -> Vec<Blog> {
    Vec::new()
}
